//! RAII lease on one unit of a token's concurrency budget.

use super::pool::TokenPool;
use super::token::Token;

/// Held for the duration of one fetch call; releases its unit when dropped.
#[derive(Debug)]
pub struct TokenSlot<'a> {
    pub(super) pool: &'a TokenPool,
    pub(super) index: usize,
}

impl TokenSlot<'_> {
    /// Position of the leased token in the pool (also its rate limiter key).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn token(&self) -> &Token {
        &self.pool.tokens()[self.index]
    }
}

impl Drop for TokenSlot<'_> {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}
