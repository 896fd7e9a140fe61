//! Logger configuration.
//!
//! All numeric limits are validated when set; out-of-range values are
//! rejected with [`LogError::InvalidConfig`] instead of being clamped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::console::ColorTable;
use crate::error::{LogError, Result};
use crate::types::LogLevel;

/// Bytes per configured megabyte of file size.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Configuration for a [`Logger`](crate::Logger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Entries below this level are dropped before enqueue.
    pub min_level: LogLevel,
    /// Batch size that forces an immediate flush.
    pub max_batch_size: usize,
    /// Longest time pending entries wait before a flush (milliseconds).
    pub max_batch_wait_ms: u64,
    /// Size that triggers same-day rotation (megabytes).
    pub max_file_size_mb: u64,
    /// Cap on same-day files; the oldest is evicted beyond it.
    pub max_files_per_day: u32,
    /// Retention sweep cutoff (days).
    pub max_file_age_days: u32,
    /// Whether console lines are colored.
    pub console_colors_enabled: bool,
    /// Whether entries are written to the console.
    pub console_enabled: bool,
    /// Whether entries are queued for the file writer.
    pub file_logging_enabled: bool,
    /// Console colors per level.
    pub colors: ColorTable,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            max_batch_size: 100,
            max_batch_wait_ms: 1000,
            max_file_size_mb: 10,
            max_files_per_day: 5,
            max_file_age_days: 30,
            console_colors_enabled: true,
            console_enabled: true,
            file_logging_enabled: false,
            colors: ColorTable::default(),
        }
    }
}

impl LoggerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Sets the batch size that forces a flush.
    #[must_use]
    pub const fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Sets the longest batch wait in milliseconds.
    #[must_use]
    pub const fn with_max_batch_wait_ms(mut self, ms: u64) -> Self {
        self.max_batch_wait_ms = ms;
        self
    }

    /// Sets the rotation size in megabytes.
    #[must_use]
    pub const fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    /// Sets the per-day file cap.
    #[must_use]
    pub const fn with_max_files_per_day(mut self, count: u32) -> Self {
        self.max_files_per_day = count;
        self
    }

    /// Sets the retention cutoff in days.
    #[must_use]
    pub const fn with_max_file_age_days(mut self, days: u32) -> Self {
        self.max_file_age_days = days;
        self
    }

    /// Enables or disables console colors.
    #[must_use]
    pub const fn with_console_colors(mut self, enabled: bool) -> Self {
        self.console_colors_enabled = enabled;
        self
    }

    /// Enables or disables console output.
    #[must_use]
    pub const fn with_console(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    /// Enables or disables file output.
    #[must_use]
    pub const fn with_file_logging(mut self, enabled: bool) -> Self {
        self.file_logging_enabled = enabled;
        self
    }

    /// Replaces the console color table.
    #[must_use]
    pub fn with_colors(mut self, colors: ColorTable) -> Self {
        self.colors = colors;
        self
    }

    /// Checks every bounded setting.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_positive("max_batch_size", self.max_batch_size as u64)?;
        check_positive("max_batch_wait_ms", self.max_batch_wait_ms)?;
        check_positive("max_file_size_mb", self.max_file_size_mb)?;
        check_positive("max_files_per_day", u64::from(self.max_files_per_day))?;
        Ok(())
    }

    /// Batch wait as a [`Duration`].
    #[must_use]
    pub const fn max_batch_wait(&self) -> Duration {
        Duration::from_millis(self.max_batch_wait_ms)
    }

    /// Rotation size in bytes.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

pub(crate) fn check_positive(field: &'static str, value: u64) -> Result<()> {
    if value < 1 {
        return Err(LogError::below_one(field));
    }
    Ok(())
}

/// Configuration shared between a logger, its worker and its file sink.
pub(crate) type SharedConfig = Arc<RwLock<LoggerConfig>>;
