//! Pending-entry queue between producers and the batch worker.

use crossbeam::queue::SegQueue;

use crate::types::LogEntry;

/// Unbounded lock-free queue of entries awaiting a flush.
///
/// Any number of threads may push; the worker and the shutdown drain pop.
/// Neither side ever blocks. Entries pushed by one thread are popped in the
/// order they were pushed.
#[derive(Debug, Default)]
pub struct EntryQueue {
    inner: SegQueue<LogEntry>,
}

impl EntryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an entry.
    pub fn push(&self, entry: LogEntry) {
        self.inner.push(entry);
    }

    /// Removes the oldest entry, if any.
    #[must_use]
    pub fn pop(&self) -> Option<LogEntry> {
        self.inner.pop()
    }

    /// Moves every entry currently queued onto the end of `batch`.
    ///
    /// Returns the number of entries moved.
    pub fn drain_into(&self, batch: &mut Vec<LogEntry>) -> usize {
        let before = batch.len();
        while let Some(entry) = self.inner.pop() {
            batch.push(entry);
        }
        batch.len() - before
    }

    /// Returns the number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
