//! Credential token.

use serde::{Deserialize, Serialize};

fn default_concurrency() -> usize {
    1
}

/// One API credential and the number of requests it may have in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
}

impl Token {
    pub fn new(id: impl Into<String>, max_concurrency: usize) -> Self {
        Self {
            id: id.into(),
            max_concurrency,
        }
    }

    /// Short form safe to write to logs: the first 4 characters then `***`.
    pub fn redacted(&self) -> String {
        let prefix: String = self.id.chars().take(4).collect();
        format!("{prefix}***")
    }
}
