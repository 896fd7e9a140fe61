//! Age-based deletion of old log files.
//!
//! Sweeps run only when asked for. Each file is judged on its own; a file
//! that cannot be inspected or removed is reported and skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, warn};

use crate::error::Result;
use crate::rotation::{BirthTime, LOG_EXTENSION, default_birth_time};

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Log files looked at.
    pub examined: usize,
    /// Files removed for being older than the cutoff.
    pub deleted: Vec<PathBuf>,
    /// Files that could not be inspected or removed.
    pub failed: usize,
}

/// Deletes log files older than a configured age.
pub struct RetentionSweeper {
    dir: PathBuf,
    birth_time: BirthTime,
}

impl std::fmt::Debug for RetentionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionSweeper")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl RetentionSweeper {
    /// Creates a sweeper for the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_birth_time(dir, default_birth_time())
    }

    pub(crate) fn with_birth_time(dir: impl Into<PathBuf>, birth_time: BirthTime) -> Self {
        Self {
            dir: dir.into(),
            birth_time,
        }
    }

    /// Deletes `*.log` files created more than `max_age_days` ago.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory exists but cannot be listed.
    /// Per-file failures are counted in the report instead.
    pub fn sweep(&self, max_age_days: u32) -> Result<SweepReport> {
        self.sweep_at(Local::now(), max_age_days)
    }

    /// Runs a sweep with an explicit notion of "now".
    ///
    /// A cutoff earlier than the representable date range deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory exists but cannot be listed.
    pub fn sweep_at(&self, now: DateTime<Local>, max_age_days: u32) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e.into()),
        };

        let cutoff = TimeDelta::try_days(i64::from(max_age_days))
            .and_then(|age| now.checked_sub_signed(age));

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    report_failure(&self.dir, &e);
                    report.failed += 1;
                    continue;
                }
            };
            if !is_log_file(&path) {
                continue;
            }
            report.examined += 1;

            let born = match (self.birth_time)(&path) {
                Ok(time) => DateTime::<Local>::from(time),
                Err(e) => {
                    report_failure(&path, &e);
                    report.failed += 1;
                    continue;
                }
            };
            if cutoff.is_none_or(|cutoff| born >= cutoff) {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), created = %born, "deleted expired log file");
                    report.deleted.push(path);
                }
                Err(e) => {
                    report_failure(&path, &e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

fn is_log_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LOG_EXTENSION) && path.is_file()
}

fn report_failure(path: &Path, err: &io::Error) {
    warn!(path = %path.display(), error = %err, "retention sweep skipped file");
    eprintln!("log retention: skipped {}: {err}", path.display());
}
