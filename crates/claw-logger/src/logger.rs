//! The producer-facing logger and its lifecycle.
//!
//! A [`Logger`] filters by level, writes to the console on the calling
//! thread, and queues entries for its background [`BatchWorker`] when file
//! logging is on. Shutdown stops the worker, waits a bounded time for it,
//! then drains whatever is still queued.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::utils::Backoff;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::config::{LoggerConfig, SharedConfig, check_positive};
use crate::console::{ColorTable, ConsoleSink};
use crate::error::{LogError, Result};
use crate::file_sink::FileSink;
use crate::queue::EntryQueue;
use crate::retention::{RetentionSweeper, SweepReport};
use crate::stats::{LoggerStats, StatsSnapshot};
use crate::traits::BatchSink;
use crate::types::{LogEntry, LogLevel};
use crate::worker::{BatchWorker, WorkerHandle, flush_batch};

/// How long shutdown waits for the worker before draining without it.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A logger shared between threads.
pub type SharedLogger = Arc<Logger>;

/// Creates a shared logger with the default configuration.
#[must_use]
pub fn shared_logger(source: impl Into<String>, log_dir: impl Into<PathBuf>) -> SharedLogger {
    Arc::new(Logger::new(source, log_dir))
}

/// Batched, rotating file logger with an optional console mirror.
///
/// Each instance owns its queue, worker thread and active file. Instances
/// are independent; two instances pointed at one directory are not
/// coordinated.
pub struct Logger {
    source: String,
    log_dir: PathBuf,
    config: SharedConfig,
    queue: Arc<EntryQueue>,
    sink: Arc<dyn BatchSink>,
    file_sink: Option<Arc<FileSink>>,
    console: ConsoleSink,
    stats: Arc<LoggerStats>,
    worker: Mutex<Option<WorkerHandle>>,
    /// Whether entries are currently queued for the worker.
    accepting: AtomicBool,
    /// Producers between their `accepting` check and their push.
    enqueuing: AtomicUsize,
    closed: AtomicBool,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("source", &self.source)
            .field("log_dir", &self.log_dir)
            .field("accepting", &self.accepting.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates a logger with the default configuration.
    ///
    /// File logging starts disabled; enable it with
    /// [`set_file_logging_enabled`](Self::set_file_logging_enabled).
    #[must_use]
    pub fn new(source: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        let config = Arc::new(RwLock::new(LoggerConfig::default()));
        let file_sink = Arc::new(FileSink::new(&log_dir, Arc::clone(&config)));
        Self::assemble(source.into(), log_dir, config, file_sink)
    }

    /// Creates a logger from a validated configuration.
    ///
    /// Starts the worker if the configuration enables file logging.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker
    /// thread cannot be started.
    pub fn with_config(
        source: impl Into<String>,
        log_dir: impl Into<PathBuf>,
        config: LoggerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let log_dir = log_dir.into();
        let shared = Arc::new(RwLock::new(config));
        let file_sink = Arc::new(FileSink::new(&log_dir, Arc::clone(&shared)));
        let logger = Self::assemble(source.into(), log_dir, shared, file_sink);
        logger.start_if_enabled()?;
        Ok(logger)
    }

    /// Creates a logger whose batches go to a custom sink.
    ///
    /// `log_dir` is still the directory retention sweeps operate on.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker
    /// thread cannot be started.
    pub fn with_sink(
        source: impl Into<String>,
        log_dir: impl Into<PathBuf>,
        config: LoggerConfig,
        sink: Arc<dyn BatchSink>,
    ) -> Result<Self> {
        config.validate()?;
        let logger = Self {
            source: source.into(),
            log_dir: log_dir.into(),
            config: Arc::new(RwLock::new(config)),
            queue: Arc::new(EntryQueue::new()),
            sink,
            file_sink: None,
            console: ConsoleSink::new(),
            stats: Arc::new(LoggerStats::new()),
            worker: Mutex::new(None),
            accepting: AtomicBool::new(false),
            enqueuing: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };
        logger.start_if_enabled()?;
        Ok(logger)
    }

    fn assemble(
        source: String,
        log_dir: PathBuf,
        config: SharedConfig,
        file_sink: Arc<FileSink>,
    ) -> Self {
        Self {
            source,
            log_dir,
            config,
            queue: Arc::new(EntryQueue::new()),
            sink: Arc::clone(&file_sink) as Arc<dyn BatchSink>,
            file_sink: Some(file_sink),
            console: ConsoleSink::new(),
            stats: Arc::new(LoggerStats::new()),
            worker: Mutex::new(None),
            accepting: AtomicBool::new(false),
            enqueuing: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn start_if_enabled(&self) -> Result<()> {
        if self.config.read().file_logging_enabled {
            self.start_worker()?;
        }
        Ok(())
    }

    // ========== Producer API ==========

    /// Logs a message at the given level.
    pub fn log(&self, message: impl Into<String>, level: LogLevel) {
        self.log_message(Some(message.into()), level);
    }

    /// Logs an optional message at the given level.
    ///
    /// Below the minimum level this does nothing. Otherwise the entry is
    /// written to the console (if enabled) before returning and queued for
    /// the file writer (if file logging is active). Never blocks on file I/O.
    pub fn log_message(&self, message: Option<String>, level: LogLevel) {
        let (to_console, colors) = {
            let config = self.config.read();
            if !level.is_at_least(config.min_level) {
                return;
            }
            let colors = config
                .console_colors_enabled
                .then(|| config.colors.get(level));
            (config.console_enabled, colors)
        };
        let to_file = self.accepting.load(Ordering::Acquire);
        if !to_console && !to_file {
            return;
        }

        let entry = LogEntry::now(level, message, self.source.as_str());
        if to_console {
            self.console.emit(&entry, colors);
        }
        if to_file {
            self.enqueue(entry);
        }
    }

    /// Queues an entry unless file logging stopped since the caller checked.
    fn enqueue(&self, entry: LogEntry) {
        self.enqueuing.fetch_add(1, Ordering::SeqCst);
        if self.accepting.load(Ordering::SeqCst) {
            self.queue.push(entry);
            self.stats.record_enqueued();
        }
        self.enqueuing.fetch_sub(1, Ordering::SeqCst);
    }

    /// Logs at [`LogLevel::Info`].
    pub fn info(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Info);
    }

    /// Logs at [`LogLevel::Warn`].
    pub fn warn(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Warn);
    }

    /// Logs at [`LogLevel::Error`].
    pub fn error(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Error);
    }

    /// Logs at [`LogLevel::Fatal`].
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Fatal);
    }

    /// Logs an error at [`LogLevel::Error`].
    pub fn log_error<E: Error + ?Sized>(&self, err: &E) {
        self.log_error_at(err, LogLevel::Error);
    }

    /// Logs an error's kind, message, stack and immediate cause.
    pub fn log_error_at<E: Error + ?Sized>(&self, err: &E, level: LogLevel) {
        if !level.is_at_least(self.config.read().min_level) {
            return;
        }
        self.log(describe_error(err, &Backtrace::capture()), level);
    }

    // ========== Configuration ==========

    /// Returns the logger's source name.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the log directory.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Returns a copy of the current configuration.
    #[must_use]
    pub fn config(&self) -> LoggerConfig {
        self.config.read().clone()
    }

    /// Returns the minimum level.
    #[must_use]
    pub fn min_level(&self) -> LogLevel {
        self.config.read().min_level
    }

    /// Sets the minimum level.
    pub fn set_min_level(&self, level: LogLevel) {
        self.config.write().min_level = level;
    }

    /// Sets the batch size that forces a flush.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] if `size` is zero.
    pub fn set_max_batch_size(&self, size: usize) -> Result<()> {
        check_positive("max_batch_size", size as u64)?;
        self.config.write().max_batch_size = size;
        Ok(())
    }

    /// Sets the longest batch wait in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] if `ms` is zero.
    pub fn set_max_batch_wait_ms(&self, ms: u64) -> Result<()> {
        check_positive("max_batch_wait_ms", ms)?;
        self.config.write().max_batch_wait_ms = ms;
        Ok(())
    }

    /// Sets the rotation size in megabytes.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] if `mb` is zero.
    pub fn set_max_file_size_mb(&self, mb: u64) -> Result<()> {
        check_positive("max_file_size_mb", mb)?;
        self.config.write().max_file_size_mb = mb;
        Ok(())
    }

    /// Sets the per-day file cap.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] if `count` is zero.
    pub fn set_max_files_per_day(&self, count: u32) -> Result<()> {
        check_positive("max_files_per_day", u64::from(count))?;
        self.config.write().max_files_per_day = count;
        Ok(())
    }

    /// Sets the retention cutoff in days.
    pub fn set_max_file_age_days(&self, days: u32) {
        self.config.write().max_file_age_days = days;
    }

    /// Enables or disables console colors.
    pub fn set_console_colors_enabled(&self, enabled: bool) {
        self.config.write().console_colors_enabled = enabled;
    }

    /// Enables or disables console output.
    pub fn set_console_enabled(&self, enabled: bool) {
        self.config.write().console_enabled = enabled;
    }

    /// Replaces the console color table.
    pub fn set_colors(&self, colors: ColorTable) {
        self.config.write().colors = colors;
    }

    /// Starts or stops the file writer.
    ///
    /// Disabling runs the same stop-and-drain sequence as shutdown but
    /// leaves the logger usable.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Closed`] after shutdown, or an I/O error if the
    /// worker thread cannot be started.
    pub fn set_file_logging_enabled(&self, enabled: bool) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed);
        }
        self.config.write().file_logging_enabled = enabled;
        if enabled {
            self.start_worker()
        } else {
            self.stop_worker();
            Ok(())
        }
    }

    /// Returns true while entries are being queued for the file writer.
    #[must_use]
    pub fn is_file_logging_active(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    // ========== Observation ==========

    /// Returns the number of entries waiting for the worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns the logger's counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the file currently receiving writes, if any.
    #[must_use]
    pub fn current_file(&self) -> Option<PathBuf> {
        self.file_sink.as_ref().and_then(|sink| sink.current_file())
    }

    /// Deletes log files older than the configured maximum age.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory exists but cannot be listed.
    pub fn sweep_retention(&self) -> Result<SweepReport> {
        let max_age = self.config.read().max_file_age_days;
        RetentionSweeper::new(&self.log_dir).sweep(max_age)
    }

    // ========== Lifecycle ==========

    /// Stops the worker and flushes everything queued.
    ///
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_worker();
    }

    /// Returns true once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn start_worker(&self) -> Result<()> {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            return Ok(());
        }
        let worker = BatchWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.sink),
            Arc::clone(&self.config),
            Arc::clone(&self.stats),
            self.source.as_str(),
        );
        *slot = Some(worker.spawn()?);
        self.accepting.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_worker(&self) {
        let mut slot = self.worker.lock();
        self.accepting.store(false, Ordering::SeqCst);

        // Every push that saw `accepting` set lands before the final drain.
        let backoff = Backoff::new();
        while self.enqueuing.load(Ordering::SeqCst) > 0 {
            backoff.snooze();
        }

        if let Some(handle) = slot.take() {
            if !handle.stop(SHUTDOWN_TIMEOUT) {
                warn!(
                    source = %self.source,
                    timeout = ?SHUTDOWN_TIMEOUT,
                    "log worker did not stop in time"
                );
            }
        }

        let mut batch = Vec::new();
        self.queue.drain_into(&mut batch);
        flush_batch(self.sink.as_ref(), &self.stats, &self.source, &mut batch);
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Renders an error as its type, message, captured stack and first cause.
pub(crate) fn describe_error<E: Error + ?Sized>(err: &E, backtrace: &Backtrace) -> String {
    let mut text = format!("{}: {err}", std::any::type_name::<E>());
    if backtrace.status() == BacktraceStatus::Captured {
        let _ = write!(text, "\n{backtrace}");
    }
    if let Some(inner) = err.source() {
        let _ = write!(text, "\n  Caused by: {inner}");
    }
    text
}
