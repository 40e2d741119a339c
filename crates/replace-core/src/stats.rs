//! Statistics for the replacement runtime.
//!
//! Snapshots are plain serializable values; producers keep their own atomic
//! counters and build a snapshot on demand through [`StatsProvider`].
//!
//! # Examples
//!
//! ```rust
//! use regexp_replace_core::stats::ReplacerStats;
//! use regexp_replace_core::ErrorKind;
//!
//! let stats = ReplacerStats::new(10, 8, [(ErrorKind::Timeout, 2)], 0, 1500);
//! assert_eq!(stats.failure_count(ErrorKind::Timeout), 2);
//! assert_eq!(stats.success_rate(), Some(0.8));
//!
//! let json = serde_json::to_string(&stats).unwrap();
//! assert!(json.contains("\"timeout\":2"));
//! ```

use crate::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of replacement call statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacerStats {
    /// Timestamp when this snapshot was captured (UTC).
    pub snapshot_time: DateTime<Utc>,

    /// Calls accepted.
    pub total_calls: u64,

    /// Calls that ended with replaced text.
    pub successful_calls: u64,

    /// Failed calls, by classified kind. Kinds with no failures are omitted.
    pub failures: BTreeMap<ErrorKind, u64>,

    /// Sandbox instances alive at snapshot time.
    pub live_instances: usize,

    /// Average wall-clock time per call in microseconds.
    pub avg_call_time_us: u64,
}

impl ReplacerStats {
    /// Creates a snapshot stamped with the current time.
    #[must_use]
    pub fn new(
        total_calls: u64,
        successful_calls: u64,
        failures: impl IntoIterator<Item = (ErrorKind, u64)>,
        live_instances: usize,
        avg_call_time_us: u64,
    ) -> Self {
        Self {
            snapshot_time: Utc::now(),
            total_calls,
            successful_calls,
            failures: failures
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .collect(),
            live_instances,
            avg_call_time_us,
        }
    }

    /// Number of failures of one kind.
    #[must_use]
    pub fn failure_count(&self, kind: ErrorKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Total failed calls across all kinds.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Fraction of calls that succeeded, or `None` before the first call.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_calls == 0 {
            return None;
        }
        Some(self.successful_calls as f64 / self.total_calls as f64)
    }
}

impl Default for ReplacerStats {
    fn default() -> Self {
        Self::new(0, 0, [], 0, 0)
    }
}

/// Trait for components that can report statistics.
pub trait StatsProvider {
    /// The statistics type produced by this provider.
    type Stats: Clone + std::fmt::Debug + Serialize;

    /// Captures a snapshot of current statistics.
    ///
    /// Must be cheap and non-blocking.
    fn capture_stats(&self) -> Self::Stats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = ReplacerStats::default();
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.success_rate(), None);
        assert!(stats.failures.is_empty());
        assert!(stats.snapshot_time <= Utc::now());
    }

    #[test]
    fn test_zero_counts_are_omitted() {
        let stats = ReplacerStats::new(
            3,
            1,
            [(ErrorKind::InvalidPattern, 2), (ErrorKind::Timeout, 0)],
            0,
            10,
        );
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.total_failures(), 2);
        assert_eq!(stats.failure_count(ErrorKind::Timeout), 0);
    }

    #[test]
    fn test_round_trip_json() {
        let stats = ReplacerStats::new(5, 4, [(ErrorKind::RuntimeFault, 1)], 2, 99);
        let json = serde_json::to_string(&stats).unwrap();
        let back: ReplacerStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.failure_count(ErrorKind::RuntimeFault), 1);
        assert_eq!(back.live_instances, 2);
    }
}
