//! Per-shard and per-run reports.

use std::time::Duration;

use crate::sharder::Shard;
use crate::worker::{AddressOutcome, WorkerError};

/// Lifecycle of one shard's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    /// Not admitted (yet); stays here when the run stops before admission.
    Pending,
    Running,
    /// Every address was processed (individual addresses may have failed).
    Completed,
    /// Stopped early by the stop signal; resumable from `cursor`.
    Interrupted,
    /// Unrecoverable shard-level error (bad shard, no tokens, panic).
    Failed,
}

impl ShardState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ShardState::Completed | ShardState::Interrupted | ShardState::Failed
        )
    }
}

/// Address counts for one shard, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardCounters {
    /// Fetched and persisted.
    pub completed: u64,
    /// Gave up on after a permanent error or exhausted retries.
    pub failed: u64,
    /// Extra attempts beyond the first, over all addresses.
    pub retried: u64,
    /// Skipped because the known-invalid ledger lists them.
    pub skipped: u64,
    /// Skipped because a record already exists.
    pub already_present: u64,
}

impl ShardCounters {
    pub fn record(&mut self, outcome: &AddressOutcome) {
        match outcome {
            AddressOutcome::Fetched { retries } => {
                self.completed += 1;
                self.retried += u64::from(*retries);
            }
            AddressOutcome::Failed { retries, .. } => {
                self.failed += 1;
                self.retried += u64::from(*retries);
            }
            AddressOutcome::KnownInvalid => self.skipped += 1,
            AddressOutcome::AlreadyPresent => self.already_present += 1,
            AddressOutcome::Interrupted { retries } => self.retried += u64::from(*retries),
        }
    }

    /// Addresses finished one way or another.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed + self.skipped + self.already_present
    }

    fn add(&mut self, other: &ShardCounters) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.retried += other.retried;
        self.skipped += other.skipped;
        self.already_present += other.already_present;
    }
}

/// An address the worker gave up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAddress {
    /// Position in the full address list.
    pub position: usize,
    pub address: String,
    pub error: String,
    /// The provider reported the address itself as unusable.
    pub invalid: bool,
}

/// Terminal (or pending) state of one shard.
#[derive(Debug, Clone)]
pub struct ShardReport {
    pub shard: Shard,
    pub state: ShardState,
    /// Index within the shard of the next address to process; pass it as
    /// `skip` to resume this shard.
    pub cursor: usize,
    /// Shard size ignoring skip.
    pub total: usize,
    pub counters: ShardCounters,
    pub failed: Vec<FailedAddress>,
    pub error: Option<WorkerError>,
}

impl ShardReport {
    /// Report for a shard that has not started.
    pub fn pending(shard: Shard, list_len: usize) -> Self {
        let total = shard.len_in(list_len);
        Self {
            shard,
            state: ShardState::Pending,
            cursor: shard.skip.min(total),
            total,
            counters: ShardCounters::default(),
            failed: Vec::new(),
            error: None,
        }
    }

    /// Addresses this shard still has to process.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.cursor)
    }

    /// Skip value that resumes this shard where it stopped.
    pub fn resume_skip(&self) -> usize {
        self.cursor
    }
}

/// Outcome of an orchestrated run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One entry per shard in the index range, in shard index order.
    pub shards: Vec<ShardReport>,
    /// The stop signal ended the run before every shard finished.
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunReport {
    /// Counters summed over every shard.
    pub fn totals(&self) -> ShardCounters {
        let mut totals = ShardCounters::default();
        for shard in &self.shards {
            totals.add(&shard.counters);
        }
        totals
    }

    pub fn completed(&self) -> u64 {
        self.totals().completed
    }

    pub fn failed(&self) -> u64 {
        self.totals().failed
    }

    pub fn retried(&self) -> u64 {
        self.totals().retried
    }

    pub fn failed_shards(&self) -> impl Iterator<Item = &ShardReport> {
        self.shards
            .iter()
            .filter(|s| s.state == ShardState::Failed)
    }

    /// Every shard completed; per-address failures are allowed.
    pub fn is_success(&self) -> bool {
        self.shards
            .iter()
            .all(|s| s.state == ShardState::Completed)
    }

    /// Addresses the provider rejected as invalid, for the known-invalid ledger.
    pub fn invalid_addresses(&self) -> impl Iterator<Item = &str> {
        self.shards
            .iter()
            .flat_map(|s| s.failed.iter())
            .filter(|f| f.invalid)
            .map(|f| f.address.as_str())
    }
}
