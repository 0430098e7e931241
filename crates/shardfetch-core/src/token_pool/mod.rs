//! Credential tokens and their shared concurrency budget.
//!
//! Each token allows `max_concurrency` requests in flight at once. Workers
//! lease one unit per fetch call through a [`TokenSlot`]; the slot returns the
//! unit when dropped, so every exit path (including fetch errors and panics)
//! gives the capacity back.

mod guard;
mod pool;
mod token;

pub use guard::TokenSlot;
pub use pool::TokenPool;
pub use token::Token;
