//! Traits for batch destinations.
//!
//! This module provides the [`BatchSink`] trait, the seam between the batch
//! worker and the place batches end up. [`FileSink`](crate::FileSink) is the
//! default implementation.

use crate::error::Result;
use crate::types::LogEntry;

/// Destination for flushed batches.
///
/// Implementors receive each batch exactly once, in flush order, from at
/// most one thread at a time per logger.
pub trait BatchSink: Send + Sync {
    /// Writes a batch of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written. The caller drops
    /// the batch; it is not retried.
    fn write_batch(&self, batch: &[LogEntry]) -> Result<()>;
}
