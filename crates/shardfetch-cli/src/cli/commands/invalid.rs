//! `shardfetch invalid` – list the known-invalid ledger of an output directory.

use anyhow::Result;
use shardfetch_core::persist::InvalidLedger;
use std::fmt::Write as _;
use std::path::Path;

pub fn run_invalid(output: &Path) -> Result<()> {
    print!("{}", list_invalid(output)?);
    Ok(())
}

/// Ledger contents of `output`, one address per line plus a count.
pub(crate) fn list_invalid(output: &Path) -> Result<String> {
    let ledger = InvalidLedger::load(&InvalidLedger::path_in(output))?;
    if ledger.is_empty() {
        return Ok("No invalid addresses recorded.\n".to_string());
    }
    let mut out = String::new();
    for address in ledger.addresses() {
        let _ = writeln!(out, "{address}");
    }
    let _ = writeln!(
        out,
        "{} invalid address(es) in {}",
        ledger.len(),
        ledger.path().display()
    );
    Ok(out)
}
