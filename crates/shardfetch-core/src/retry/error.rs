//! Fetch error type for retry classification.

/// Error returned by a fetch (or persist) attempt for one address.
/// Classified into an [`ErrorKind`](super::ErrorKind) before deciding retries.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Provider answered with its rate-limit message.
    #[error("provider rate limit: {0}")]
    RateLimited(String),
    /// Provider returned no body.
    #[error("empty response from provider")]
    EmptyResponse,
    /// Body was not the expected shape; usually a truncated or proxy response.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Address does not exist at the provider or has no verified record.
    #[error("not found: {0}")]
    NotFound(String),
    /// Writing the fetched record failed.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// Retryable failure reported by a non-curl fetcher.
    #[error("{0}")]
    Transient(String),
    /// Terminal failure reported by a fetcher (e.g. credential rejected).
    #[error("{0}")]
    Permanent(String),
    /// The stop signal was raised before the request was sent.
    #[error("stopped before sending the request")]
    Stopped,
}

impl FetchError {
    /// True when the failure is specific to the address itself, so later
    /// runs may skip it without asking the provider again.
    pub fn is_address_invalid(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    /// True when the policy would retry this error (given attempts left).
    pub fn is_transient(&self) -> bool {
        super::classify(self).is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_marks_the_address_invalid() {
        assert!(FetchError::NotFound("Contract source code not verified".into()).is_address_invalid());
        assert!(!FetchError::Permanent("Invalid API Key".into()).is_address_invalid());
        assert!(!FetchError::RateLimited("Max rate limit reached".into()).is_address_invalid());
        assert!(!FetchError::Stopped.is_address_invalid());
    }

    #[test]
    fn stopped_is_never_retried() {
        assert!(!FetchError::Stopped.is_transient());
    }
}
