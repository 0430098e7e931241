use std::time::Duration;

use crate::config::{configured_duration, RetryConfig};
use crate::error::ConfigError;

/// High-level classification of an error for retry purposes.
///
/// Callers map HTTP status codes, curl errors, provider messages and IO
/// failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Provider asked us to slow down (429, 503, rate-limit message).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Empty or unparseable body.
    BadResponse,
    /// Persisting the record failed (disk or lock contention).
    Storage,
    /// Anything terminal: not found, not verified, rejected credential.
    Permanent,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Permanent)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with caps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::try_from(&RetryConfig::default()).unwrap_or_else(|_| Self::no_retry())
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = ConfigError;

    /// Delays must be finite, non-negative and at most
    /// [`MAX_CONFIGURED_DELAY`](crate::config::MAX_CONFIGURED_DELAY).
    fn try_from(cfg: &RetryConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: configured_duration("retry.base_delay_secs", cfg.base_delay_secs)?,
            max_delay: configured_duration("retry.max_delay_secs", cfg.max_delay_secs as f64)?,
        })
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            return RetryDecision::NoRetry;
        }
        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        let raw = self.base_delay.saturating_mul(exp);
        RetryDecision::RetryAfter(raw.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_permanent() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Permanent), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 40;
        let delay = |attempt| match p.decide(attempt, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry"),
        };
        assert_eq!(delay(2), delay(1) * 2);
        assert!(delay(3) >= delay(2));
        assert_eq!(delay(30), p.max_delay);
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Storage),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn built_from_config() {
        let cfg = RetryConfig {
            max_attempts: 0,
            base_delay_secs: 0.5,
            max_delay_secs: 4,
        };
        let p = RetryPolicy::try_from(&cfg).unwrap();
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn default_matches_default_config() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 8);
        assert_eq!(p.base_delay, Duration::from_secs(1));
        assert_eq!(p.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn out_of_range_delays_are_config_errors() {
        let huge_base = RetryConfig {
            base_delay_secs: 1e300,
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetryPolicy::try_from(&huge_base),
            Err(ConfigError::Duration { what: "retry.base_delay_secs", .. })
        ));
        let negative_base = RetryConfig {
            base_delay_secs: -1.0,
            ..RetryConfig::default()
        };
        assert!(RetryPolicy::try_from(&negative_base).is_err());
        let huge_max = RetryConfig {
            max_delay_secs: u64::MAX,
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetryPolicy::try_from(&huge_max),
            Err(ConfigError::Duration { what: "retry.max_delay_secs", .. })
        ));
    }
}
