//! Input loaders: the ordered address list and the credential tokens.
//!
//! Every failure surfaces as a [`ConfigError`](crate::error::ConfigError) so a
//! bad input file aborts the run before any shard starts.

mod addresses;
mod tokens;

pub use addresses::{load_addresses, parse_addresses};
pub use tokens::{load_tokens, parse_tokens};
pub(crate) use tokens::validate_tokens;
