//! Inclusive range of shard indices processed by one run.

use crate::error::ConfigError;

/// Shard indices `[start, end]` (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Every shard: `[0, shard_count - 1]`.
    pub fn whole(shard_count: usize) -> Self {
        Self {
            start: 0,
            end: shard_count.saturating_sub(1),
        }
    }

    /// Checks `0 <= start <= end < shard_count`.
    pub fn validate(&self, shard_count: usize) -> Result<(), ConfigError> {
        if shard_count == 0 {
            return Err(ConfigError::ZeroShardCount);
        }
        if self.start > self.end || self.end >= shard_count {
            return Err(ConfigError::IndexRange {
                start: self.start,
                end: self.end,
                shard_count,
            });
        }
        Ok(())
    }

    /// Number of shard indices in the range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}
