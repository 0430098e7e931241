//! Persistence collaborator and output layout.
//!
//! Records land at `<output>/<address>.json`, written to a temp file and
//! renamed into place, so a record is either absent or complete and writing
//! the same address twice just replaces it. Multi-file sources are unpacked
//! under `<output>/contracts/`.

mod ledger;
mod sanitize;
mod sources;

pub use ledger::{InvalidLedger, LEDGER_FILE};
pub use sanitize::{record_file_name, relative_source_path, sanitize_component};
pub use sources::{parse_sources, unwrap_double_braces};

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fetch::ContractData;

/// Directory (under the output root) receiving unpacked source files.
pub const SOURCES_DIR: &str = "contracts";

/// Writes one record. Must tolerate being called more than once for the
/// same address (overwrite or no-op).
pub trait Persister: Send + Sync {
    fn persist(&self, address: &str, data: &ContractData) -> io::Result<()>;

    /// Whether a record for `address` is already stored.
    fn exists(&self, _address: &str) -> bool {
        false
    }
}

/// Temp path next to `final_path`, unique per `nonce`.
pub(crate) fn temp_path(final_path: &Path, nonce: u64) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(format!(".{}.{}.part", std::process::id(), nonce));
    PathBuf::from(o)
}

/// Default persister: pretty JSON per address plus optional source extraction.
#[derive(Debug)]
pub struct JsonPersister {
    output_root: PathBuf,
    extract_sources: bool,
    nonce: AtomicU64,
}

impl JsonPersister {
    /// Creates the output directory if needed.
    pub fn new(output_root: impl Into<PathBuf>) -> Result<Self> {
        let output_root = output_root.into();
        std::fs::create_dir_all(&output_root)
            .with_context(|| format!("create output dir: {}", output_root.display()))?;
        Ok(Self {
            output_root,
            extract_sources: true,
            nonce: AtomicU64::new(1),
        })
    }

    pub fn with_extract_sources(mut self, extract: bool) -> Self {
        self.extract_sources = extract;
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Where the record for `address` is stored.
    pub fn record_path(&self, address: &str) -> PathBuf {
        self.output_root.join(record_file_name(address))
    }

    fn write_atomic(&self, final_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let tmp = temp_path(final_path, self.nonce.fetch_add(1, Ordering::Relaxed));
        let written = std::fs::File::create(&tmp).and_then(|mut f| f.write_all(bytes));
        let result = written.and_then(|()| std::fs::rename(&tmp, final_path));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }

    /// Unpacks multi-file sources; returns the number of files written.
    fn extract(&self, data: &ContractData) -> io::Result<usize> {
        let Some(files) = parse_sources(&data.source_code) else {
            if unwrap_double_braces(&data.source_code).starts_with('{') {
                tracing::warn!(address = %data.address, "source payload looks like JSON but could not be unpacked");
            }
            return Ok(0);
        };
        let root = self.output_root.join(SOURCES_DIR);
        let mut written = 0;
        for (path, content) in &files {
            let Some(rel) = relative_source_path(path) else {
                tracing::debug!(address = %data.address, path, "skipping unusable source path");
                continue;
            };
            let dest = root.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.write_atomic(&dest, content.as_bytes())?;
            written += 1;
        }
        Ok(written)
    }
}

impl Persister for JsonPersister {
    fn persist(&self, address: &str, data: &ContractData) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(&data.raw)?;
        self.write_atomic(&self.record_path(address), &json)?;
        if self.extract_sources {
            let files = self.extract(data)?;
            if files > 0 {
                tracing::debug!(address, files, "extracted source files");
            }
        }
        Ok(())
    }

    fn exists(&self, address: &str) -> bool {
        self.record_path(address).is_file()
    }
}
