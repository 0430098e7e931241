//! CLI for the shardfetch bulk downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shardfetch_core::config;
use std::path::PathBuf;

use commands::{run_fetch, run_invalid, run_plan};

/// Every shard completed (per-address failures allowed).
pub const EXIT_SUCCESS: i32 = 0;
/// Bad configuration or a failed shard.
pub const EXIT_FAILURE: i32 = 1;
/// Stopped by the operator; the report shows where to resume.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Top-level CLI for the shardfetch downloader.
#[derive(Debug, Parser)]
#[command(name = "shardfetch")]
#[command(about = "shardfetch: sharded, rate-limited bulk downloader for verified contract sources", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/shardfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every address in the selected shards.
    Run(RunArgs),

    /// Show shard sizes and what remains after --skip, without fetching.
    Plan {
        /// Address list (one address per line, or first CSV column).
        #[arg(long, value_name = "PATH")]
        addresses: PathBuf,
        #[arg(long, default_value_t = 1, value_name = "N")]
        shard_count: usize,
        /// First shard index (inclusive).
        #[arg(long, value_name = "I")]
        start: Option<usize>,
        /// Last shard index (inclusive).
        #[arg(long, value_name = "I")]
        end: Option<usize>,
        #[arg(long, default_value_t = 0, value_name = "N")]
        skip: usize,
    },

    /// List addresses recorded as invalid in an output directory.
    Invalid {
        #[arg(long, value_name = "DIR")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Token file: JSON array or one API key per line.
    #[arg(long, value_name = "PATH")]
    pub tokens: PathBuf,

    /// Address list (one address per line, or first CSV column).
    #[arg(long, value_name = "PATH")]
    pub addresses: PathBuf,

    /// Directory receiving one record per address.
    #[arg(long, default_value = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// Number of shards the address list is split into.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub shard_count: usize,

    /// First shard index to process (inclusive, default 0).
    #[arg(long, value_name = "I")]
    pub start: Option<usize>,

    /// Last shard index to process (inclusive, default shard_count - 1).
    #[arg(long, value_name = "I")]
    pub end: Option<usize>,

    /// Worker threads alive at once; -1 runs one per shard.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true, value_name = "N")]
    pub threads: i64,

    /// Entries to skip at the start of every shard (resume point).
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub skip: usize,

    /// Concurrent requests per token (overrides the config file).
    #[arg(long, value_name = "N")]
    pub token_multiplier: Option<usize>,

    /// Do not request addresses that already have a record.
    #[arg(long)]
    pub skip_existing: bool,

    /// Request addresses even if the invalid ledger lists them.
    #[arg(long)]
    pub retry_invalid: bool,

    /// Do not unpack multi-file sources.
    #[arg(long)]
    pub no_extract: bool,
}

impl CliCommand {
    /// Parses arguments, runs the command and returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run(args) => run_fetch(&cfg, args).await,
            CliCommand::Plan {
                addresses,
                shard_count,
                start,
                end,
                skip,
            } => run_plan(&addresses, shard_count, start, end, skip).map(|()| EXIT_SUCCESS),
            CliCommand::Invalid { output } => run_invalid(&output).map(|()| EXIT_SUCCESS),
        }
    }
}

#[cfg(test)]
mod tests;
