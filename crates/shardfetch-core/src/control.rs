//! Run-wide stop signal (e.g. operator interrupt).
//!
//! Workers check the signal before each address and wake from backoff sleeps
//! when it is raised, so a stopped run returns promptly with a partial,
//! resumable report. In-flight requests are never cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    stopped: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Cloneable handle; all clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every sleeper.
    pub fn request_stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            let _guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.inner.wake.notify_all();
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless the signal is raised first.
    /// Returns true if the sleep ended because of a stop request.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_stop_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .inner
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_runs_to_completion_without_stop() {
        let stop = StopSignal::new();
        let start = Instant::now();
        assert!(!stop.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn stop_wakes_sleepers_early() {
        let stop = StopSignal::new();
        let s = stop.clone();
        let sleeper = std::thread::spawn(move || {
            let start = Instant::now();
            let stopped = s.sleep(Duration::from_secs(30));
            (stopped, start.elapsed())
        });
        std::thread::sleep(Duration::from_millis(20));
        stop.request_stop();
        let (stopped, elapsed) = sleeper.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
        assert!(stop.is_stop_requested());
    }

    #[test]
    fn sleep_after_stop_returns_immediately() {
        let stop = StopSignal::new();
        stop.request_stop();
        assert!(stop.sleep(Duration::from_secs(30)));
    }
}
