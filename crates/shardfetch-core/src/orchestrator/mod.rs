//! Orchestrator: plans shards, admits workers within the thread cap, and
//! collects their reports over a result channel.
//!
//! Workers never share counters with the orchestrator; each sends progress
//! snapshots and its final [`ShardReport`] as messages. A worker panic is
//! caught on its own thread and reported as a failed shard.

mod progress;
mod report;

pub use progress::ProgressStats;
pub use report::{FailedAddress, RunReport, ShardCounters, ShardReport, ShardState};

use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use crate::control::StopSignal;
use crate::error::ConfigError;
use crate::fetch::Fetcher;
use crate::input::validate_tokens;
use crate::persist::Persister;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::sharder::{shards_for, AddressList, IndexRange, Shard};
use crate::token_pool::{Token, TokenPool};
use crate::worker::{FetchWorker, WorkerContext, WorkerError};

/// Thread cap: a positive bound, or one thread per shard in the range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadCount {
    Bounded(usize),
    #[default]
    PerShard,
}

impl ThreadCount {
    /// Command-line form: `-1` means one per shard; other values must be positive.
    pub fn from_arg(value: i64) -> Result<Self, ConfigError> {
        match value {
            -1 => Ok(ThreadCount::PerShard),
            n if n > 0 => usize::try_from(n)
                .map(ThreadCount::Bounded)
                .map_err(|_| ConfigError::ThreadCount(value)),
            n => Err(ConfigError::ThreadCount(n)),
        }
    }

    /// Worker threads allowed alive at once for `shard_count` shards.
    pub fn resolve(self, shard_count: usize) -> Result<usize, ConfigError> {
        match self {
            ThreadCount::Bounded(0) => Err(ConfigError::ThreadCount(0)),
            ThreadCount::Bounded(n) => Ok(n),
            ThreadCount::PerShard => Ok(shard_count.max(1)),
        }
    }
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub addresses: Arc<AddressList>,
    pub tokens: Vec<Token>,
    pub shard_count: usize,
    /// Shards to process; `None` means all of them.
    pub index_range: Option<IndexRange>,
    pub thread_count: ThreadCount,
    /// Entries skipped at the start of every shard.
    pub skip: usize,
    pub retry: RetryPolicy,
    /// Per-token request rate; non-positive disables spacing.
    pub requests_per_sec: f64,
    pub skip_existing: bool,
    /// Addresses never requested (known-invalid ledger).
    pub known_invalid: HashSet<String>,
}

impl RunConfig {
    pub fn new(addresses: Arc<AddressList>, tokens: Vec<Token>, shard_count: usize) -> Self {
        Self {
            addresses,
            tokens,
            shard_count,
            index_range: None,
            thread_count: ThreadCount::PerShard,
            skip: 0,
            retry: RetryPolicy::default(),
            requests_per_sec: crate::config::RateLimitConfig::default().requests_per_sec,
            skip_existing: false,
            known_invalid: HashSet::new(),
        }
    }
}

enum WorkerEvent {
    Progress {
        slot: usize,
        cursor: usize,
        counters: ShardCounters,
    },
    Finished {
        slot: usize,
        report: Result<ShardReport, String>,
    },
}

/// Runs shards on a bounded set of worker threads.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    persister: Arc<dyn Persister>,
    stop: StopSignal,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn Fetcher>, persister: Arc<dyn Persister>) -> Self {
        Self {
            fetcher,
            persister,
            stop: StopSignal::new(),
            progress_tx: None,
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Progress snapshots are sent with `try_send`; a full channel drops them.
    pub fn with_progress(mut self, tx: tokio::sync::mpsc::Sender<ProgressStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Validates `config`, runs every shard in its index range, and waits for
    /// all admitted workers. Configuration problems fail before any shard starts.
    pub fn run(&self, config: RunConfig) -> Result<RunReport, ConfigError> {
        let started = Instant::now();
        let range = config
            .index_range
            .unwrap_or_else(|| IndexRange::whole(config.shard_count));
        let shards = shards_for(&config.addresses, config.shard_count, range, config.skip)?;
        let threads = config.thread_count.resolve(shards.len())?;
        validate_tokens(&config.tokens)?;
        let limiter = RateLimiter::per_second(config.tokens.len(), config.requests_per_sec)?;

        let pool = Arc::new(TokenPool::new(config.tokens));
        let capacity = pool.capacity();
        if threads > capacity {
            tracing::info!(
                threads,
                capacity,
                "thread count exceeds token capacity; extra workers will wait for a free token"
            );
        }
        let list_len = config.addresses.len();
        tracing::info!(
            addresses = list_len,
            shards = shards.len(),
            shard_count = config.shard_count,
            range_start = range.start,
            range_end = range.end,
            threads,
            tokens = pool.len(),
            skip = config.skip,
            "starting run"
        );

        let ctx = Arc::new(WorkerContext {
            limiter: Arc::new(limiter),
            addresses: config.addresses,
            pool,
            fetcher: Arc::clone(&self.fetcher),
            persister: Arc::clone(&self.persister),
            retry: config.retry,
            stop: self.stop.clone(),
            known_invalid: Arc::new(config.known_invalid),
            skip_existing: config.skip_existing,
        });

        let mut reports: Vec<ShardReport> = shards
            .iter()
            .map(|s| ShardReport::pending(*s, list_len))
            .collect();
        let start_cursors: Vec<usize> = reports.iter().map(|r| r.cursor).collect();
        let total_addresses: u64 = reports.iter().map(|r| r.remaining() as u64).sum();
        let mut queue: VecDeque<(usize, Shard)> = shards.into_iter().enumerate().collect();

        let (tx, rx) = mpsc::channel::<WorkerEvent>();
        let mut handles = Vec::with_capacity(threads.min(reports.len()));
        let mut running = 0usize;
        let mut finished = 0usize;

        loop {
            while running < threads && !self.stop.is_stop_requested() {
                let Some((slot, shard)) = queue.pop_front() else {
                    break;
                };
                match spawn_worker(slot, shard, list_len, Arc::clone(&ctx), tx.clone()) {
                    Ok(handle) => {
                        reports[slot].state = ShardState::Running;
                        handles.push(handle);
                        running += 1;
                    }
                    Err(e) => {
                        tracing::error!(shard = %shard, error = %e, "failed to spawn worker");
                        reports[slot].state = ShardState::Failed;
                        reports[slot].error = Some(WorkerError::Spawn(e.to_string()));
                        finished += 1;
                    }
                }
            }
            if running == 0 {
                break;
            }
            let event = match rx.recv() {
                Ok(ev) => ev,
                Err(_) => break,
            };
            match event {
                WorkerEvent::Progress {
                    slot,
                    cursor,
                    counters,
                } => {
                    reports[slot].cursor = cursor;
                    reports[slot].counters = counters;
                }
                WorkerEvent::Finished { slot, report } => {
                    running -= 1;
                    finished += 1;
                    match report {
                        Ok(report) => reports[slot] = report,
                        Err(msg) => {
                            tracing::error!(shard = %reports[slot].shard, panic = %msg, "worker panicked");
                            reports[slot].state = ShardState::Failed;
                            reports[slot].error = Some(WorkerError::Panicked(msg));
                        }
                    }
                }
            }
            if let Some(progress_tx) = &self.progress_tx {
                let done: u64 = reports
                    .iter()
                    .zip(&start_cursors)
                    .map(|(r, start)| r.cursor.saturating_sub(*start) as u64)
                    .sum();
                let failed = reports.iter().map(|r| r.counters.failed).sum();
                let _ = progress_tx.try_send(ProgressStats {
                    addresses_done: done,
                    total_addresses,
                    failed,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    shards_done: finished,
                    shard_count: reports.len(),
                });
            }
        }
        drop(tx);
        for handle in handles {
            let _ = handle.join();
        }
        for (index, token) in ctx.pool.tokens().iter().enumerate() {
            tracing::info!(token = %token.redacted(), requests = ctx.pool.leases(index), "token usage");
        }

        let interrupted = reports
            .iter()
            .any(|r| matches!(r.state, ShardState::Interrupted | ShardState::Pending));
        let report = RunReport {
            shards: reports,
            interrupted,
            elapsed: started.elapsed(),
        };
        let totals = report.totals();
        tracing::info!(
            completed = totals.completed,
            failed = totals.failed,
            retried = totals.retried,
            skipped = totals.skipped,
            already_present = totals.already_present,
            interrupted,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "run finished"
        );
        Ok(report)
    }
}

fn spawn_worker(
    slot: usize,
    shard: Shard,
    list_len: usize,
    ctx: Arc<WorkerContext>,
    tx: mpsc::Sender<WorkerEvent>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("shard-{}", shard.shard_index))
        .spawn(move || {
            let progress = tx.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                FetchWorker::new(shard, list_len).run_with(&ctx, |r| {
                    let _ = progress.send(WorkerEvent::Progress {
                        slot,
                        cursor: r.cursor,
                        counters: r.counters,
                    });
                })
            }));
            let report = result.map_err(|payload| panic_message(payload.as_ref()));
            let _ = tx.send(WorkerEvent::Finished { slot, report });
        })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
