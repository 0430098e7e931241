//! Progress reporting for a run (addresses done, ETA, rate).
//!
//! Sent by the orchestrator to the CLI; consumers can compute
//! rate = addresses_done / elapsed_secs and ETA = remaining / rate.

/// Snapshot of run progress (CLI-friendly).
#[derive(Debug, Clone, Default)]
pub struct ProgressStats {
    /// Addresses processed so far this run (fetched, failed or skipped).
    pub addresses_done: u64,
    /// Addresses this run set out to process (after skip).
    pub total_addresses: u64,
    /// Addresses given up on so far.
    pub failed: u64,
    /// Elapsed time since the run started (seconds).
    pub elapsed_secs: f64,
    /// Shards in a terminal state.
    pub shards_done: usize,
    pub shard_count: usize,
}

impl ProgressStats {
    /// Addresses per second (0 if elapsed is 0).
    pub fn addresses_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.addresses_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_addresses.saturating_sub(self.addresses_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.addresses_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_addresses == 0 {
            return 1.0;
        }
        (self.addresses_done as f64 / self.total_addresses as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_eta_fraction() {
        let p = ProgressStats {
            addresses_done: 50,
            total_addresses: 200,
            elapsed_secs: 10.0,
            ..ProgressStats::default()
        };
        assert!((p.addresses_per_sec() - 5.0).abs() < 1e-9);
        assert!((p.eta_secs().unwrap() - 30.0).abs() < 1e-9);
        assert!((p.fraction() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn no_rate_yet() {
        let p = ProgressStats {
            total_addresses: 10,
            ..ProgressStats::default()
        };
        assert_eq!(p.addresses_per_sec(), 0.0);
        assert!(p.eta_secs().is_none());
        assert_eq!(p.fraction(), 0.0);
    }

    #[test]
    fn empty_run_is_complete() {
        let p = ProgressStats::default();
        assert_eq!(p.fraction(), 1.0);
        assert_eq!(p.eta_secs(), Some(0.0));
    }
}
