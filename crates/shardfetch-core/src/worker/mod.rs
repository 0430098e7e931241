//! Fetch worker: walks one shard's addresses in order.
//!
//! A worker owns its shard and cursor. Per-address errors are recorded and
//! never end the shard; only shard-level problems (bad shard, no tokens) mark
//! it failed. The stop signal is checked before every address, so an
//! interrupted shard resumes exactly at its cursor.

mod process;

pub use process::AddressOutcome;

use std::collections::HashSet;
use std::sync::Arc;

use crate::control::StopSignal;
use crate::error::ConfigError;
use crate::fetch::Fetcher;
use crate::orchestrator::{FailedAddress, ShardReport, ShardState};
use crate::persist::Persister;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::sharder::{AddressList, Shard};
use crate::token_pool::TokenPool;

/// Shard-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("failed to start worker thread: {0}")]
    Spawn(String),
}

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub struct WorkerContext {
    pub addresses: Arc<AddressList>,
    pub pool: Arc<TokenPool>,
    pub limiter: Arc<RateLimiter>,
    pub fetcher: Arc<dyn Fetcher>,
    pub persister: Arc<dyn Persister>,
    pub retry: RetryPolicy,
    pub stop: StopSignal,
    pub known_invalid: Arc<HashSet<String>>,
    pub skip_existing: bool,
}

/// Processes one shard from its skip offset to the end.
#[derive(Debug)]
pub struct FetchWorker {
    report: ShardReport,
}

impl FetchWorker {
    pub fn new(shard: Shard, list_len: usize) -> Self {
        Self {
            report: ShardReport::pending(shard, list_len),
        }
    }

    pub fn shard(&self) -> Shard {
        self.report.shard
    }

    pub fn run(self, ctx: &WorkerContext) -> ShardReport {
        self.run_with(ctx, |_| {})
    }

    /// Runs the shard to a terminal state, calling `observe` after every
    /// finished address with the report so far.
    pub fn run_with<F>(mut self, ctx: &WorkerContext, mut observe: F) -> ShardReport
    where
        F: FnMut(&ShardReport),
    {
        let shard = self.report.shard;
        if let Err(e) = shard.validate() {
            return self.fail(e);
        }
        if ctx.pool.is_empty() {
            return self.fail(ConfigError::NoTokens);
        }

        let _span = tracing::info_span!("shard", shard = %shard).entered();
        self.report.state = ShardState::Running;
        tracing::info!(
            shard = %shard,
            skip = shard.skip,
            remaining = self.report.remaining(),
            "shard started"
        );

        for (position, address) in shard.addresses(&ctx.addresses) {
            if ctx.stop.is_stop_requested() {
                self.report.state = ShardState::Interrupted;
                break;
            }
            let outcome = process::process_address(ctx, address);
            self.report.counters.record(&outcome);
            match &outcome {
                AddressOutcome::Failed { error, retries } => {
                    tracing::warn!(shard = %shard, position, address, retries, %error, "address failed");
                    self.report.failed.push(FailedAddress {
                        position,
                        address: address.to_string(),
                        error: error.to_string(),
                        invalid: error.is_address_invalid(),
                    });
                }
                AddressOutcome::Interrupted { .. } => {
                    self.report.state = ShardState::Interrupted;
                    break;
                }
                _ => {}
            }
            self.report.cursor += 1;
            observe(&self.report);
        }

        if self.report.state == ShardState::Running {
            self.report.state = ShardState::Completed;
        }
        let c = &self.report.counters;
        tracing::info!(
            shard = %shard,
            state = ?self.report.state,
            cursor = self.report.cursor,
            completed = c.completed,
            failed = c.failed,
            retried = c.retried,
            skipped = c.skipped + c.already_present,
            "shard finished"
        );
        self.report
    }

    fn fail(mut self, error: impl Into<WorkerError>) -> ShardReport {
        let error = error.into();
        tracing::error!(shard = %self.report.shard, %error, "shard failed");
        self.report.state = ShardState::Failed;
        self.report.error = Some(error);
        self.report
    }
}
