//! Address list loader (CSV, address in the first column).

use std::io::Read;
use std::path::Path;

use crate::error::ConfigError;
use crate::sharder::AddressList;

/// Reads the first column of every non-empty CSV record, keeping file order.
///
/// No header row is assumed: positions must stay identical across runs, and
/// the row index is the address position.
pub fn load_addresses(path: &Path) -> Result<AddressList, ConfigError> {
    let file = std::fs::File::open(path).map_err(|e| ConfigError::input("addresses", path, e))?;
    let list = parse_addresses(file).map_err(|e| ConfigError::input("addresses", path, e))?;
    tracing::info!(count = list.len(), path = %path.display(), "loaded address list");
    Ok(list)
}

/// Parse addresses from any CSV reader.
pub fn parse_addresses<R: Read>(reader: R) -> Result<AddressList, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match record.get(0) {
            Some(address) if !address.is_empty() => entries.push(address.to_string()),
            _ => {}
        }
    }
    Ok(AddressList::new(entries))
}
