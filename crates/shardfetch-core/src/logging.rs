//! Tracing setup for the CLI.
//!
//! Logs go to an append-only file under the XDG state dir unless
//! `SHARDFETCH_LOG_FILE` names another file (or `-` for stderr). Worker
//! threads are named `shard-{i}` and thread names are always printed, so
//! interleaved shards can be told apart.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,shardfetch=debug,shardfetch_core=debug";

/// Overrides the log destination; `-` means stderr.
pub const LOG_FILE_ENV: &str = "SHARDFETCH_LOG_FILE";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

impl LogTarget {
    /// `~/.local/state/shardfetch/shardfetch.log`.
    pub fn default_file() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("shardfetch")?;
        Ok(LogTarget::File(
            xdg_dirs.get_state_home().join("shardfetch").join("shardfetch.log"),
        ))
    }

    /// Target for a `SHARDFETCH_LOG_FILE` value; `None` or empty keeps the default file.
    pub fn from_setting(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            Some("-") => Ok(LogTarget::Stderr),
            Some(path) if !path.is_empty() => Ok(LogTarget::File(PathBuf::from(path))),
            _ => Self::default_file(),
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::File(path) => write!(f, "{}", path.display()),
            LogTarget::Stderr => f.write_str("stderr"),
        }
    }
}

/// Installs the global subscriber for the configured target.
/// Returns Err (e.g. log dir unwritable) so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let setting = std::env::var(LOG_FILE_ENV).ok();
    install(&LogTarget::from_setting(setting.as_deref())?)
}

/// Stderr-only logging, for when [`init_logging`] fails.
pub fn init_logging_stderr() {
    let _ = install(&LogTarget::Stderr);
}

pub fn install(target: &LogTarget) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_thread_names(true);
    let installed = match target {
        LogTarget::File(path) => builder.with_writer(Arc::new(open_append(path)?)).try_init(),
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
    tracing::info!(destination = %target, "shardfetch logging initialized");
    Ok(())
}

fn open_append(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir: {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file: {}", path.display()))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
