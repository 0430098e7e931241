//! Retry loop: run a closure until success, a terminal error, exhausted
//! attempts, or a stop request. A closure returning [`FetchError::Stopped`]
//! ends the loop as interrupted.

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::StopSignal;

/// Result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, FetchError>,
    /// Attempts made, including the first (so retries = attempts - 1).
    pub attempts: u32,
    /// The loop gave up because the stop signal was raised during backoff.
    pub interrupted: bool,
}

impl<T> RetryOutcome<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Runs `f(attempt)` until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again;
/// the sleep ends early if `stop` is raised.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, stop: &StopSignal, mut f: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    interrupted: false,
                }
            }
            Err(FetchError::Stopped) => {
                return RetryOutcome {
                    result: Err(FetchError::Stopped),
                    attempts: attempt,
                    interrupted: true,
                }
            }
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                            interrupted: false,
                        }
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(
                            attempt,
                            ?kind,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "retrying after backoff"
                        );
                        if stop.sleep(d) {
                            return RetryOutcome {
                                result: Err(e),
                                attempts: attempt,
                                interrupted: true,
                            };
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
