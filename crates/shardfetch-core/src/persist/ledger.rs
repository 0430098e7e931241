//! Known-invalid address ledger (`not_valid.json` in the output directory).
//!
//! Addresses the provider reported as nonexistent or unverified are recorded
//! here so later runs skip them instead of spending requests on them again.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File name of the ledger inside the output directory.
pub const LEDGER_FILE: &str = "not_valid.json";

#[derive(Debug, Clone, Default)]
pub struct InvalidLedger {
    path: PathBuf,
    addresses: BTreeSet<String>,
}

impl InvalidLedger {
    /// Ledger path for an output directory.
    pub fn path_in(output_root: &Path) -> PathBuf {
        output_root.join(LEDGER_FILE)
    }

    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let addresses = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<BTreeSet<String>>(&bytes)
                .with_context(|| format!("parse invalid-address ledger: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read invalid-address ledger: {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            addresses,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn addresses(&self) -> &BTreeSet<String> {
        &self.addresses
    }

    /// Adds addresses; returns how many were new.
    pub fn extend<I, S>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.addresses.len();
        self.addresses.extend(addresses.into_iter().map(Into::into));
        self.addresses.len() - before
    }

    /// Writes the ledger as a sorted JSON array (temp file + rename).
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(&self.addresses).context("serialize ledger")?;
        let tmp = super::temp_path(&self.path, 0);
        std::fs::write(&tmp, json).with_context(|| format!("write ledger: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace ledger: {}", self.path.display()))?;
        Ok(())
    }
}
