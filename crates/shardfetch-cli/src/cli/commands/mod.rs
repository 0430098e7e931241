//! CLI command handlers. Each command is in its own file.

pub(super) mod invalid;
pub(super) mod plan;
pub(super) mod run;

pub use invalid::run_invalid;
pub use plan::run_plan;
pub use run::run_fetch;

use shardfetch_core::sharder::IndexRange;

/// `--start`/`--end` as an index range; `None` when neither is given.
pub(crate) fn index_range(
    shard_count: usize,
    start: Option<usize>,
    end: Option<usize>,
) -> Option<IndexRange> {
    if start.is_none() && end.is_none() {
        return None;
    }
    Some(IndexRange::new(
        start.unwrap_or(0),
        end.unwrap_or(shard_count.saturating_sub(1)),
    ))
}
