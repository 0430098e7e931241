//! Address list partitioning.
//!
//! Splits an ordered address list into `shard_count` disjoint shards by
//! position modulo `shard_count`. The mapping depends only on the list order
//! and the shard count, so separate processes (or a later run) agree on which
//! addresses belong to which shard and a per-shard `skip` resumes exactly
//! where a previous run stopped.

mod list;
mod range;
mod shard;

pub use list::AddressList;
pub use range::IndexRange;
pub use shard::{shards_for, Shard};
