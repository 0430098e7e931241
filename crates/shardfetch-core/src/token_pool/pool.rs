//! Token pool: per-token in-flight counters with blocking, round-robin acquisition.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::ConfigError;

use super::guard::TokenSlot;
use super::token::Token;

/// Shared pool of tokens. Workers call [`TokenPool::acquire`] before each
/// request; when every token is saturated the caller blocks until a slot is
/// dropped.
#[derive(Debug)]
pub struct TokenPool {
    tokens: Vec<Token>,
    in_use: Vec<AtomicUsize>,
    leases: Vec<AtomicU64>,
    next: AtomicUsize,
    lock: Mutex<()>,
    freed: Condvar,
}

impl TokenPool {
    pub fn new(tokens: Vec<Token>) -> Self {
        let in_use = tokens.iter().map(|_| AtomicUsize::new(0)).collect();
        let leases = tokens.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            tokens,
            in_use,
            leases,
            next: AtomicUsize::new(0),
            lock: Mutex::new(()),
            freed: Condvar::new(),
        }
    }

    /// Pool where every id gets the same concurrency budget.
    pub fn with_multiplier<I, S>(ids: I, token_multiplier: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| Token::new(id, token_multiplier))
                .collect(),
        )
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Sum of all tokens' budgets: the most requests that can be in flight at once.
    pub fn capacity(&self) -> usize {
        self.tokens.iter().map(|t| t.max_concurrency).sum()
    }

    /// Requests currently in flight on token `index`.
    pub fn in_flight(&self, index: usize) -> usize {
        self.in_use
            .get(index)
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub fn total_in_flight(&self) -> usize {
        self.in_use.iter().map(|c| c.load(Ordering::Acquire)).sum()
    }

    /// Number of slots ever granted on token `index`.
    pub fn leases(&self, index: usize) -> u64 {
        self.leases
            .get(index)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Blocks until some token has spare capacity and leases one unit of it.
    ///
    /// Fails immediately with [`ConfigError::NoTokens`] on an empty pool.
    pub fn acquire(&self) -> Result<TokenSlot<'_>, ConfigError> {
        if self.tokens.is_empty() {
            return Err(ConfigError::NoTokens);
        }
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(index) = self.reserve_any() {
                return Ok(TokenSlot { pool: self, index });
            }
            guard = self
                .freed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of [`TokenPool::acquire`]; `None` when all tokens are saturated.
    pub fn try_acquire(&self) -> Option<TokenSlot<'_>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reserve_any().map(|index| TokenSlot { pool: self, index })
    }

    /// Round-robin scan starting after the last granted token.
    fn reserve_any(&self) -> Option<usize> {
        let n = self.tokens.len();
        if n == 0 {
            return None;
        }
        let start = self.next.load(Ordering::Relaxed) % n;
        for offset in 0..n {
            let index = (start + offset) % n;
            if self.try_reserve(index) {
                self.next.store((index + 1) % n, Ordering::Relaxed);
                self.leases[index].fetch_add(1, Ordering::Relaxed);
                return Some(index);
            }
        }
        None
    }

    fn try_reserve(&self, index: usize) -> bool {
        let max = self.tokens[index].max_concurrency;
        let counter = &self.in_use[index];
        let mut current = counter.load(Ordering::Relaxed);
        loop {
            if current >= max {
                return false;
            }
            match counter.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns one unit of token `index` and wakes one waiter.
    pub(super) fn release(&self, index: usize) {
        let counter = &self.in_use[index];
        let mut current = counter.load(Ordering::Relaxed);
        while current > 0 {
            match counter.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.freed.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn empty_pool_fails_immediately() {
        let pool = TokenPool::new(Vec::new());
        assert_eq!(pool.acquire().unwrap_err(), ConfigError::NoTokens);
        assert!(pool.try_acquire().is_none());
    }

    #[test]
    fn slot_is_returned_on_drop() {
        let pool = TokenPool::with_multiplier(["a"], 1);
        {
            let slot = pool.acquire().unwrap();
            assert_eq!(slot.token().id, "a");
            assert_eq!(pool.in_flight(0), 1);
            assert!(pool.try_acquire().is_none());
        }
        assert_eq!(pool.in_flight(0), 0);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn round_robin_spreads_leases() {
        let pool = TokenPool::with_multiplier(["a", "b", "c"], 1);
        let order: Vec<usize> = (0..6)
            .map(|_| pool.acquire().unwrap().index())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(pool.leases(0), 2);
        assert_eq!(pool.leases(2), 2);
    }

    #[test]
    fn saturated_token_is_skipped() {
        let pool = TokenPool::with_multiplier(["a", "b"], 1);
        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_ne!(first.index(), second.index());
        assert!(pool.try_acquire().is_none());
        drop(first);
        let third = pool.acquire().unwrap();
        assert_eq!(pool.total_in_flight(), 2);
        drop(third);
        drop(second);
        assert_eq!(pool.total_in_flight(), 0);
    }

    #[test]
    fn multiplier_allows_parallel_slots_on_one_token() {
        let pool = TokenPool::with_multiplier(["a"], 3);
        let slots: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(pool.in_flight(0), 3);
        assert!(pool.try_acquire().is_none());
        drop(slots);
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn acquire_blocks_until_release() {
        let pool = Arc::new(TokenPool::with_multiplier(["a"], 1));
        let (tx, rx) = std::sync::mpsc::channel();
        let p = Arc::clone(&pool);
        let holder = std::thread::spawn(move || {
            let _slot = p.acquire().unwrap();
            tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(50));
        });
        rx.recv().unwrap();
        let slot = pool.acquire().unwrap();
        assert_eq!(pool.in_flight(0), 1);
        drop(slot);
        holder.join().unwrap();
    }

    #[test]
    fn concurrent_stress_never_exceeds_budget() {
        let pool = Arc::new(TokenPool::with_multiplier(["a", "b"], 2));
        let peaks: Arc<Vec<AtomicUsize>> = Arc::new((0..2).map(|_| AtomicUsize::new(0)).collect());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let peaks = Arc::clone(&peaks);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let slot = pool.acquire().unwrap();
                        let now = pool.in_flight(slot.index());
                        peaks[slot.index()].fetch_max(now, Ordering::Relaxed);
                        std::thread::yield_now();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for peak in peaks.iter() {
            assert!(peak.load(Ordering::Relaxed) <= 2);
        }
        assert_eq!(pool.total_in_flight(), 0);
    }
}
