//! Fetch collaborator.
//!
//! The worker only sees the [`Fetcher`] trait. [`EtherscanClient`] is the
//! built-in implementation: a libcurl GET against the provider's
//! `getsourcecode` endpoint, with the answer decoded and classified by
//! [`parse_source_response`].

mod etherscan;
mod parse;

pub use etherscan::EtherscanClient;
pub use parse::parse_source_response;

use crate::retry::FetchError;
use crate::token_pool::Token;

/// One fetched record.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractData {
    pub address: String,
    pub contract_name: String,
    pub compiler_version: String,
    /// Source as returned by the provider (single file or `{{...}}`-wrapped standard JSON).
    pub source_code: String,
    /// The provider's full result entry, persisted verbatim.
    pub raw: serde_json::Value,
}

/// Performs one request for `address` using `token`. Implementations must be
/// shareable across worker threads and classify their failures through
/// [`FetchError`] variants.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, address: &str, token: &Token) -> Result<ContractData, FetchError>;
}
