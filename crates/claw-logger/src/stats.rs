//! Counters describing what a logger has done.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by producers and the batch worker.
#[derive(Debug, Default)]
pub struct LoggerStats {
    enqueued: AtomicU64,
    flushes: AtomicU64,
    flushed_entries: AtomicU64,
    failed_flushes: AtomicU64,
    dropped_entries: AtomicU64,
}

/// Point-in-time copy of [`LoggerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Entries pushed onto the queue.
    pub enqueued: u64,
    /// Successful batch writes.
    pub flushes: u64,
    /// Entries written by successful flushes.
    pub flushed_entries: u64,
    /// Batch writes that failed.
    pub failed_flushes: u64,
    /// Entries lost with failed batches.
    pub dropped_entries: u64,
}

impl LoggerStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, entries: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.flushed_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, entries: usize) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
        self.dropped_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flushed_entries: self.flushed_entries.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            dropped_entries: self.dropped_entries.load(Ordering::Relaxed),
        }
    }
}
