//! `shardfetch run` – fetch and store every address in the selected shards.

use anyhow::{Context, Result};
use shardfetch_core::config::FetchConfig;
use shardfetch_core::control::StopSignal;
use shardfetch_core::fetch::EtherscanClient;
use shardfetch_core::input::{load_addresses, load_tokens};
use shardfetch_core::orchestrator::{
    Orchestrator, ProgressStats, RunConfig, RunReport, ShardState, ThreadCount,
};
use shardfetch_core::persist::{InvalidLedger, JsonPersister};
use shardfetch_core::retry::RetryPolicy;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use super::index_range;
use crate::cli::{RunArgs, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SUCCESS};

const PROGRESS_INTERVAL_MS: u64 = 1000;

pub async fn run_fetch(cfg: &FetchConfig, args: RunArgs) -> Result<i32> {
    let multiplier = args.token_multiplier.unwrap_or(cfg.token_multiplier);
    let tokens = load_tokens(&args.tokens, multiplier)?;
    let addresses = Arc::new(load_addresses(&args.addresses)?);
    let thread_count = ThreadCount::from_arg(args.threads)?;

    let persister = Arc::new(
        JsonPersister::new(&args.output)?
            .with_extract_sources(cfg.extract_sources && !args.no_extract),
    );
    let mut ledger = InvalidLedger::load(&InvalidLedger::path_in(&args.output))?;
    let known_invalid: HashSet<String> = if args.retry_invalid {
        HashSet::new()
    } else {
        ledger.addresses().iter().cloned().collect()
    };
    if !known_invalid.is_empty() {
        tracing::info!(count = known_invalid.len(), "skipping known-invalid addresses");
    }
    let client = Arc::new(EtherscanClient::from_config(&cfg.provider)?);

    let run_cfg = RunConfig {
        index_range: index_range(args.shard_count, args.start, args.end),
        thread_count,
        skip: args.skip,
        retry: RetryPolicy::try_from(&cfg.retry)?,
        requests_per_sec: cfg.rate_limit.requests_per_sec,
        skip_existing: args.skip_existing,
        known_invalid,
        ..RunConfig::new(addresses, tokens, args.shard_count)
    };

    let stop = StopSignal::new();
    let signal_stop = stop.clone();
    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received: finishing in-flight requests, then stopping");
            tracing::warn!("interrupt received, stopping after in-flight requests");
            signal_stop.request_stop();
        }
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(64);
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.addresses_done >= stats.total_addresses
            {
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                eprintln!(
                    "  {} / {} addresses ({:.1}%)  {} failed  {:.2}/s  shards {}/{}  ETA {}",
                    stats.addresses_done,
                    stats.total_addresses,
                    stats.fraction() * 100.0,
                    stats.failed,
                    stats.addresses_per_sec(),
                    stats.shards_done,
                    stats.shard_count,
                    eta
                );
                last_print = now;
            }
        }
    });

    let orchestrator = Orchestrator::new(client, persister)
        .with_stop_signal(stop)
        .with_progress(progress_tx);
    let report = tokio::task::spawn_blocking(move || orchestrator.run(run_cfg))
        .await
        .context("orchestrator task failed")??;

    signal_handle.abort();
    let _ = progress_handle.await;

    let added = ledger.extend(report.invalid_addresses());
    if added > 0 {
        ledger.save()?;
        tracing::info!(added, path = %ledger.path().display(), "updated invalid ledger");
    }

    print!("{}", format_report(&report));
    Ok(exit_code(&report))
}

pub(crate) fn exit_code(report: &RunReport) -> i32 {
    if report.failed_shards().next().is_some() {
        EXIT_FAILURE
    } else if report.interrupted {
        EXIT_INTERRUPTED
    } else {
        EXIT_SUCCESS
    }
}

/// Per-shard summary: state, progress, resume skip and failed addresses.
pub(crate) fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    for shard in &report.shards {
        let c = &shard.counters;
        let state = format!("{:?}", shard.state).to_lowercase();
        let _ = write!(
            out,
            "shard {}: {} {}/{}  completed {} failed {} retried {} skipped {}",
            shard.shard,
            state,
            shard.cursor,
            shard.total,
            c.completed,
            c.failed,
            c.retried,
            c.skipped + c.already_present
        );
        if matches!(shard.state, ShardState::Interrupted | ShardState::Pending)
            && shard.remaining() > 0
        {
            let _ = write!(
                out,
                "  (resume with --start {i} --end {i} --skip {})",
                shard.resume_skip(),
                i = shard.shard.shard_index
            );
        }
        if let Some(err) = &shard.error {
            let _ = write!(out, "  error: {err}");
        }
        out.push('\n');
        for f in &shard.failed {
            let _ = writeln!(out, "    {} [{}] {}", f.address, f.position, f.error);
        }
    }
    let t = report.totals();
    let _ = writeln!(
        out,
        "{} completed, {} failed, {} retried, {} skipped, {} already present in {:.1}s{}",
        t.completed,
        t.failed,
        t.retried,
        t.skipped,
        t.already_present,
        report.elapsed.as_secs_f64(),
        if report.interrupted { " (interrupted)" } else { "" }
    );
    out
}
