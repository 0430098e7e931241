//! Shard type and shard planning.

use std::fmt;

use crate::error::ConfigError;

use super::{AddressList, IndexRange};

/// The addresses whose position modulo `shard_count` equals `shard_index`,
/// minus the first `skip` of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shard {
    pub shard_count: usize,
    pub shard_index: usize,
    pub skip: usize,
}

impl Shard {
    /// Builds a shard, rejecting `shard_index >= shard_count`.
    pub fn new(shard_count: usize, shard_index: usize, skip: usize) -> Result<Self, ConfigError> {
        let shard = Self {
            shard_count,
            shard_index,
            skip,
        };
        shard.validate()?;
        Ok(shard)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::ZeroShardCount);
        }
        if self.shard_index >= self.shard_count {
            return Err(ConfigError::ShardIndex {
                shard_index: self.shard_index,
                shard_count: self.shard_count,
            });
        }
        Ok(())
    }

    /// Total entries of this shard in a list of `list_len` addresses, ignoring skip.
    pub fn len_in(&self, list_len: usize) -> usize {
        if self.shard_count == 0 || self.shard_index >= list_len {
            return 0;
        }
        (list_len - self.shard_index).div_ceil(self.shard_count)
    }

    /// Entries left to process after applying skip.
    pub fn remaining_in(&self, list_len: usize) -> usize {
        self.len_in(list_len).saturating_sub(self.skip)
    }

    /// List positions of this shard after skip, in increasing order.
    pub fn positions(&self, list_len: usize) -> impl Iterator<Item = usize> {
        let step = self.shard_count.max(1);
        (self.shard_index..list_len).step_by(step).skip(self.skip)
    }

    /// `(position, address)` pairs after skip, in increasing position order.
    pub fn addresses<'a>(
        &self,
        list: &'a AddressList,
    ) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        self.positions(list.len())
            .filter_map(move |p| list.get(p).map(|a| (p, a)))
    }

    /// Same shard, resuming after `cursor` processed entries.
    pub fn resume_from(&self, cursor: usize) -> Self {
        Self {
            skip: cursor,
            ..*self
        }
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shard_index + 1, self.shard_count)
    }
}

/// Builds one shard per index in `index_range`, each starting after `skip` entries.
pub fn shards_for(
    address_list: &AddressList,
    shard_count: usize,
    index_range: IndexRange,
    skip: usize,
) -> Result<Vec<Shard>, ConfigError> {
    index_range.validate(shard_count)?;
    let shards: Vec<Shard> = index_range
        .indices()
        .map(|shard_index| Shard {
            shard_count,
            shard_index,
            skip,
        })
        .collect();
    for shard in &shards {
        tracing::debug!(
            shard = %shard,
            total = shard.len_in(address_list.len()),
            remaining = shard.remaining_in(address_list.len()),
            "planned shard"
        );
    }
    Ok(shards)
}
