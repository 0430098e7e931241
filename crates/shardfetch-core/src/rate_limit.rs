//! Per-token request spacing.
//!
//! Each token has its own "next allowed" instant behind its own mutex; a
//! worker reserves the next free instant for its token and sleeps until then.
//! Tokens never share state, so throttling one token never delays another.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::configured_duration;
use crate::control::StopSignal;
use crate::error::ConfigError;

/// Enforces a minimum interval between requests issued on the same token.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_allowed: Vec<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(token_count: usize, min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: (0..token_count).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Limiter allowing `requests_per_sec` per token. Non-positive, NaN and
    /// infinite rates disable spacing; rates so low that the interval would
    /// exceed [`MAX_CONFIGURED_DELAY`](crate::config::MAX_CONFIGURED_DELAY)
    /// are rejected.
    pub fn per_second(token_count: usize, requests_per_sec: f64) -> Result<Self, ConfigError> {
        let interval = if requests_per_sec.is_finite() && requests_per_sec > 0.0 {
            configured_duration("request interval", requests_per_sec.recip())?
        } else {
            Duration::ZERO
        };
        Ok(Self::new(token_count, interval))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reserves the next request instant on `token` and returns how long the
    /// caller must wait for it.
    pub fn reserve(&self, token: usize) -> Duration {
        let Some(state) = self.next_allowed.get(token) else {
            return Duration::ZERO;
        };
        let mut next = state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let at = match *next {
            Some(t) if t > now => t,
            _ => now,
        };
        *next = Some(at + self.min_interval);
        at - now
    }

    /// Blocks the calling thread until a request may be issued on `token`.
    /// Returns the time spent waiting, or `None` when `stop` was raised
    /// before or during the wait; the caller must not send the request then.
    pub fn throttle(&self, token: usize, stop: &StopSignal) -> Option<Duration> {
        let wait = self.reserve(token);
        if stop.sleep(wait) {
            return None;
        }
        Some(wait)
    }

    /// Pushes `token`'s next allowed instant at least `delay` into the future,
    /// e.g. after the provider answered with a rate-limit response.
    pub fn penalize(&self, token: usize, delay: Duration) {
        let Some(state) = self.next_allowed.get(token) else {
            return;
        };
        let mut next = state.lock().unwrap_or_else(PoisonError::into_inner);
        let until = Instant::now() + delay;
        if next.map_or(true, |t| t < until) {
            *next = Some(until);
        }
        tracing::debug!(token, delay_ms = delay.as_millis() as u64, "token penalized");
    }
}
