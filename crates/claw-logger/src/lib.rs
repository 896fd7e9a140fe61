//! # claw-logger
//!
//! Batched, rotating file logger for Clawbernetes components.
//!
//! This crate provides:
//!
//! - [`Logger`] — Level-filtered producer API with console mirror
//! - [`LoggerConfig`] — Batch, rotation and retention settings
//! - [`LogEntry`] / [`LogLevel`] — Immutable log events and their severity
//! - [`BatchWorker`] — Background thread that batches queued entries
//! - [`FileSink`] — Day-named files with size rotation and a per-day cap
//! - [`RetentionSweeper`] — Age-based deletion of old log files
//! - [`BatchSink`] — Abstract trait for batch destinations
//!
//! ## Example
//!
//! ```rust,no_run
//! use claw_logger::{LogLevel, Logger, LoggerConfig};
//!
//! let config = LoggerConfig::new()
//!     .with_min_level(LogLevel::Warn)
//!     .with_file_logging(true);
//! let logger = Logger::with_config("gateway", "/var/log/claw", config)?;
//!
//! logger.info("filtered out");
//! logger.error("upstream refused connection");
//!
//! logger.shutdown();
//! # Ok::<(), claw_logger::LogError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod console;
pub mod error;
pub mod file_sink;
pub mod logger;
pub mod queue;
pub mod retention;
pub mod rotation;
pub mod stats;
pub mod traits;
pub mod types;
pub mod worker;

// Re-export main types
pub use config::{BYTES_PER_MB, LoggerConfig};
pub use console::{ColorPair, ColorTable, ConsoleSink};
pub use error::{LogError, Result};
pub use file_sink::FileSink;
pub use logger::{Logger, SHUTDOWN_TIMEOUT, SharedLogger, shared_logger};
pub use queue::EntryQueue;
pub use retention::{RetentionSweeper, SweepReport};
pub use rotation::{ActiveFile, LOG_EXTENSION, RotationManager, file_name_for, parse_file_name};
pub use stats::{LoggerStats, StatsSnapshot};
pub use traits::BatchSink;
pub use types::{LogEntry, LogLevel, TIMESTAMP_FORMAT};
pub use worker::{BatchWorker, WorkerHandle};

// Color values used by `ColorPair`.
pub use crossterm::style::Color;
