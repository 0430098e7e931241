//! Configuration errors: fatal, raised before any shard starts work.

use std::path::PathBuf;

/// Bad shard, range, thread or token arguments, or unreadable input files.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("shard count must be at least 1")]
    ZeroShardCount,

    #[error("index range [{start}, {end}] is invalid for {shard_count} shard(s)")]
    IndexRange {
        start: usize,
        end: usize,
        shard_count: usize,
    },

    #[error("shard index {shard_index} is out of range for {shard_count} shard(s)")]
    ShardIndex {
        shard_index: usize,
        shard_count: usize,
    },

    #[error("thread count must be positive or -1 (one per shard), got {0}")]
    ThreadCount(i64),

    #[error("token {0:?} has a concurrency budget of 0")]
    ZeroConcurrency(String),

    #[error("no tokens configured")]
    NoTokens,

    #[error("duplicate token {0:?}")]
    DuplicateToken(String),

    #[error("{what} of {value} is out of range (0 to {max_secs}s)")]
    Duration {
        what: &'static str,
        value: String,
        max_secs: u64,
    },

    #[error("failed to load {what} from {}: {reason}", path.display())]
    Input {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn input(what: &'static str, path: &std::path::Path, reason: impl ToString) -> Self {
        ConfigError::Input {
            what,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
