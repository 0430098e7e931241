//! Retry and backoff policy.
//!
//! This module encapsulates fetch error classification (timeouts, throttling,
//! connection failures, permanent provider answers) and exponential backoff
//! decisions so the fetch and persist steps of a worker share one policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryOutcome};
