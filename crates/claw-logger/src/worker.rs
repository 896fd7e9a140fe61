//! Background batch consumer.
//!
//! One [`BatchWorker`] thread runs per logger while file logging is on. It
//! drains the [`EntryQueue`], groups entries into batches and hands them to a
//! [`BatchSink`]. Cancellation is cooperative: the worker polls a stop
//! channel between iterations and always flushes what it holds before
//! exiting.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{info, warn};

use crate::config::SharedConfig;
use crate::queue::EntryQueue;
use crate::stats::LoggerStats;
use crate::traits::BatchSink;
use crate::types::LogEntry;

/// Longest idle sleep between polls of an empty queue.
pub const IDLE_POLL: Duration = Duration::from_millis(10);

/// Waits up to `timeout` for a stop request. A dropped sender counts as one.
fn stop_requested(stop: &Receiver<()>, timeout: Duration) -> bool {
    if timeout.is_zero() {
        return !matches!(stop.try_recv(), Err(TryRecvError::Empty));
    }
    !matches!(stop.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
}

/// Handle to a running worker thread.
///
/// The worker holds the only sender of the `finished` channel, so the
/// channel disconnects when the thread exits, panics included.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: Sender<()>,
    finished: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Asks the worker to stop and waits up to `timeout` for it to finish.
    ///
    /// Returns true if the worker finished within the timeout. A worker that
    /// does not finish in time is left detached.
    pub fn stop(mut self, timeout: Duration) -> bool {
        let _ = self.stop.try_send(());
        let finished = matches!(
            self.finished.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        );
        if finished {
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    warn!("log worker panicked");
                }
            }
        }
        finished
    }

    /// Returns true once the worker thread has exited its loop.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.finished.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// Drains the queue into batches and flushes them.
pub struct BatchWorker {
    queue: Arc<EntryQueue>,
    sink: Arc<dyn BatchSink>,
    config: SharedConfig,
    stats: Arc<LoggerStats>,
    source: String,
}

impl BatchWorker {
    pub(crate) fn new(
        queue: Arc<EntryQueue>,
        sink: Arc<dyn BatchSink>,
        config: SharedConfig,
        stats: Arc<LoggerStats>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            sink,
            config,
            stats,
            source: source.into(),
        }
    }

    /// Starts the worker on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub(crate) fn spawn(self) -> io::Result<WorkerHandle> {
        let (stop, stop_rx) = channel::bounded(1);
        let (finished_tx, finished) = channel::bounded::<()>(0);

        let thread = thread::Builder::new()
            .name(format!("claw-logger-{}", self.source))
            .spawn(move || {
                let _finished = finished_tx;
                self.run(&stop_rx);
            })?;

        Ok(WorkerHandle {
            stop,
            finished,
            thread: Some(thread),
        })
    }

    /// Runs the batching loop until a stop is requested, then flushes once more.
    pub(crate) fn run(&self, stop: &Receiver<()>) {
        info!(source = %self.source, "log worker started");
        let mut batch: Vec<LogEntry> = Vec::new();
        let mut last_flush = Instant::now();

        loop {
            let (max_batch, max_wait) = {
                let config = self.config.read();
                (config.max_batch_size, config.max_batch_wait())
            };

            let mut drained = 0usize;
            while let Some(entry) = self.queue.pop() {
                drained += 1;
                batch.push(entry);
                if batch.len() >= max_batch {
                    self.flush(&mut batch);
                    last_flush = Instant::now();
                }
            }

            if batch.is_empty() {
                // Nothing pending: the wait clock starts with the next entry.
                last_flush = Instant::now();
            } else if last_flush.elapsed() >= max_wait {
                self.flush(&mut batch);
                last_flush = Instant::now();
            }

            let nap = if drained > 0 {
                Duration::ZERO
            } else if batch.is_empty() {
                IDLE_POLL
            } else {
                max_wait.saturating_sub(last_flush.elapsed()).min(IDLE_POLL)
            };
            if stop_requested(stop, nap) {
                break;
            }
        }

        self.queue.drain_into(&mut batch);
        self.flush(&mut batch);
        info!(source = %self.source, "log worker stopped");
    }

    /// Writes out `batch` and clears it. Failures drop the batch.
    pub(crate) fn flush(&self, batch: &mut Vec<LogEntry>) {
        flush_batch(self.sink.as_ref(), &self.stats, &self.source, batch);
    }
}

/// Writes `batch` to `sink`, reporting and dropping it on failure.
pub(crate) fn flush_batch(
    sink: &dyn BatchSink,
    stats: &LoggerStats,
    source: &str,
    batch: &mut Vec<LogEntry>,
) {
    if batch.is_empty() {
        return;
    }
    match sink.write_batch(batch) {
        Ok(()) => stats.record_flush(batch.len()),
        Err(e) => {
            stats.record_failure(batch.len());
            warn!(source, error = %e, dropped = batch.len(), "log batch write failed");
            eprintln!(
                "{source}: failed to write {} log entries: {e}",
                batch.len()
            );
        }
    }
    batch.clear();
}
