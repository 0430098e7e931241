//! Provider client: HTTP GET of a contract's verified source via libcurl.

use anyhow::{Context, Result};
use std::time::Duration;

use super::{parse_source_response, ContractData, Fetcher};
use crate::config::ProviderConfig;
use crate::retry::FetchError;
use crate::token_pool::Token;

/// Blocking client for the `module=contract&action=getsourcecode` endpoint.
/// Each call uses its own curl handle, so one client is shared by all workers.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    api_url: url::Url,
    connect_timeout: Duration,
    timeout: Duration,
}

impl EtherscanClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url =
            url::Url::parse(api_url).with_context(|| format!("invalid provider URL: {api_url}"))?;
        Ok(Self {
            api_url,
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
        })
    }

    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        Ok(Self::new(&cfg.api_url)?.with_timeouts(
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.timeout_secs),
        ))
    }

    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = total;
        self
    }

    /// Full request URL for `address` with `api_key`.
    pub fn request_url(&self, address: &str, api_key: &str) -> url::Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("module", "contract")
            .append_pair("action", "getsourcecode")
            .append_pair("address", address)
            .append_pair("apikey", api_key);
        url
    }

    fn get(&self, url: &url::Url) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.accept_encoding("")?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(body)
    }
}

impl Fetcher for EtherscanClient {
    fn fetch(&self, address: &str, token: &Token) -> Result<ContractData, FetchError> {
        let url = self.request_url(address, &token.id);
        tracing::trace!(address, token = %token.redacted(), "GET getsourcecode");
        let body = self.get(&url)?;
        parse_source_response(address, &body)
    }
}
