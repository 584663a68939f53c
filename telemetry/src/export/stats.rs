//! Self-observability counters.
//!
//! Kept outside the instrument registry so the pipeline never records
//! telemetry about itself into its own queues.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one batched signal.
#[derive(Debug, Default)]
pub struct SignalStats {
    dropped_overflow: AtomicU64,
    dropped_export: AtomicU64,
    batches_exported: AtomicU64,
    records_exported: AtomicU64,
    batch_retries: AtomicU64,
}

impl SignalStats {
    /// Counts one record dropped at a full queue and returns the new total.
    pub(crate) fn record_overflow(&self) -> u64 {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_export(&self, records: usize, retries: u32) {
        self.batches_exported.fetch_add(1, Ordering::Relaxed);
        self.records_exported
            .fetch_add(records as u64, Ordering::Relaxed);
        self.batch_retries
            .fetch_add(u64::from(retries), Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, records: usize, retries: u32) {
        self.dropped_export
            .fetch_add(records as u64, Ordering::Relaxed);
        self.batch_retries
            .fetch_add(u64::from(retries), Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> SignalStatsSnapshot {
        SignalStatsSnapshot {
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            dropped_export: self.dropped_export.load(Ordering::Relaxed),
            batches_exported: self.batches_exported.load(Ordering::Relaxed),
            records_exported: self.records_exported.load(Ordering::Relaxed),
            batch_retries: self.batch_retries.load(Ordering::Relaxed),
        }
    }
}

/// Counter values for one batched signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalStatsSnapshot {
    /// Records refused or evicted because the queue was full.
    pub dropped_overflow: u64,
    /// Records dropped after export retries were exhausted.
    pub dropped_export: u64,
    /// Batches accepted by the backend.
    pub batches_exported: u64,
    /// Records accepted by the backend.
    pub records_exported: u64,
    /// Retry attempts across all batches.
    pub batch_retries: u64,
}

impl SignalStatsSnapshot {
    /// Total records lost, for any reason.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped_overflow + self.dropped_export
    }
}
