//! `shardfetch plan` – shard sizes and remaining work for an address file.

use anyhow::Result;
use shardfetch_core::input::load_addresses;
use shardfetch_core::sharder::{shards_for, IndexRange, Shard};
use std::fmt::Write as _;
use std::path::Path;

pub fn run_plan(
    addresses: &Path,
    shard_count: usize,
    start: Option<usize>,
    end: Option<usize>,
    skip: usize,
) -> Result<()> {
    let list = load_addresses(addresses)?;
    let range = super::index_range(shard_count, start, end)
        .unwrap_or_else(|| IndexRange::whole(shard_count));
    let shards = shards_for(&list, shard_count, range, skip)?;
    print!("{}", format_plan(list.len(), &shards));
    Ok(())
}

pub(crate) fn format_plan(list_len: usize, shards: &[Shard]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:>10} {:>10} {:>10}", "SHARD", "TOTAL", "SKIP", "REMAINING");
    let mut total = 0usize;
    let mut remaining = 0usize;
    for shard in shards {
        let len = shard.len_in(list_len);
        let left = shard.remaining_in(list_len);
        total += len;
        remaining += left;
        let _ = writeln!(
            out,
            "{:<8} {:>10} {:>10} {:>10}",
            shard.shard_index,
            len,
            shard.skip.min(len),
            left
        );
    }
    let _ = writeln!(
        out,
        "{} shard(s) of {}, {} address(es), {} remaining",
        shards.len(),
        shards.first().map_or(0, |s| s.shard_count),
        total,
        remaining
    );
    out
}
