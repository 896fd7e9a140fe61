//! File-backed batch sink.
//!
//! This module provides:
//! - [`FileSink`] — Writes batches as plain-text lines into rotating day files
//! - Implementation of [`BatchSink`]

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;

use crate::config::SharedConfig;
use crate::error::Result;
use crate::rotation::RotationManager;
use crate::traits::BatchSink;
use crate::types::LogEntry;

/// Writes batches into `{dir}/{yyyy-MM-dd}[_n].log`.
///
/// The rotation check, file open and write for one batch run under a single
/// mutex, so concurrent flush paths cannot interleave inside a file or race
/// a rotation decision.
#[derive(Debug)]
pub struct FileSink {
    config: SharedConfig,
    rotation: Mutex<RotationManager>,
}

impl FileSink {
    pub(crate) fn new(dir: impl Into<PathBuf>, config: SharedConfig) -> Self {
        Self {
            config,
            rotation: Mutex::new(RotationManager::new(dir)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_birth_time(
        dir: impl Into<PathBuf>,
        config: SharedConfig,
        birth_time: crate::rotation::BirthTime,
    ) -> Self {
        Self {
            config,
            rotation: Mutex::new(RotationManager::with_birth_time(dir, birth_time)),
        }
    }

    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.rotation.lock().dir().to_path_buf()
    }

    /// Returns the path of the file currently receiving writes.
    #[must_use]
    pub fn current_file(&self) -> Option<PathBuf> {
        self.rotation.lock().active().map(|a| a.path.clone())
    }

    /// Writes a batch as if the current date were `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation, opening or writing fails. Nothing is
    /// retried and the tracked file size is only advanced on success.
    pub fn write_batch_on(&self, today: NaiveDate, batch: &[LogEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for entry in batch {
            buf.push_str(&entry.format_line());
            buf.push('\n');
        }
        let bytes = buf.len() as u64;

        let (max_bytes, max_files) = {
            let config = self.config.read();
            (config.max_file_size_bytes(), config.max_files_per_day)
        };

        let mut rotation = self.rotation.lock();
        let path = rotation
            .prepare(today, bytes, max_bytes, max_files)?
            .path
            .clone();
        append(&path, buf.as_bytes())?;
        rotation.record_write(bytes);
        Ok(())
    }
}

fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()
}

impl BatchSink for FileSink {
    fn write_batch(&self, batch: &[LogEntry]) -> Result<()> {
        self.write_batch_on(Local::now().date_naive(), batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BYTES_PER_MB, LoggerConfig};
    use crate::rotation::{BirthTime, file_name_for};
    use crate::types::LogLevel;
    use parking_lot::RwLock;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn make_entry(message: &str) -> LogEntry {
        LogEntry::now(LogLevel::Info, Some(message.to_string()), "sink")
    }

    fn shared(config: LoggerConfig) -> SharedConfig {
        Arc::new(RwLock::new(config))
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .expect("read log file")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn writes_one_line_per_entry() {
        let dir = TempDir::new().expect("create temp dir");
        let sink = FileSink::new(dir.path(), shared(LoggerConfig::default()));
        let today = day(2024, 6, 1);

        sink.write_batch_on(today, &[make_entry("a"), make_entry("b")])
            .expect("write batch");

        let path = dir.path().join("2024-06-01.log");
        let written = lines(&path);
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("[Info] sink: a"));
        assert!(written[1].ends_with("[Info] sink: b"));
        assert_eq!(sink.current_file(), Some(path));
    }

    #[test]
    fn appends_across_batches() {
        let dir = TempDir::new().expect("create temp dir");
        let sink = FileSink::new(dir.path(), shared(LoggerConfig::default()));
        let today = day(2024, 6, 1);

        sink.write_batch_on(today, &[make_entry("1")]).expect("first");
        sink.write_batch_on(today, &[make_entry("2")]).expect("second");

        assert_eq!(lines(&dir.path().join("2024-06-01.log")).len(), 2);
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let dir = TempDir::new().expect("create temp dir");
        let logs = dir.path().join("logs");
        let sink = FileSink::new(&logs, shared(LoggerConfig::default()));

        sink.write_batch_on(day(2024, 6, 1), &[]).expect("empty batch");
        assert!(!logs.exists());
        assert!(sink.current_file().is_none());
    }

    #[test]
    fn date_change_moves_to_new_file() {
        let dir = TempDir::new().expect("create temp dir");
        let sink = FileSink::new(dir.path(), shared(LoggerConfig::default()));

        sink.write_batch_on(day(2024, 6, 1), &[make_entry("late")])
            .expect("day one");
        sink.write_batch_on(day(2024, 6, 2), &[make_entry("early")])
            .expect("day two");

        assert_eq!(lines(&dir.path().join("2024-06-01.log")).len(), 1);
        assert_eq!(lines(&dir.path().join("2024-06-02.log")).len(), 1);
    }

    #[test]
    fn batch_exceeding_cap_lands_in_suffixed_file() {
        let dir = TempDir::new().expect("create temp dir");
        let today = day(2024, 6, 1);
        let base = dir.path().join(file_name_for(today, 0));
        // Leave room for less than one line.
        let filler = usize::try_from(BYTES_PER_MB).expect("fits usize") - 8;
        fs::write(&base, vec![b'.'; filler]).expect("prefill");

        let sink = FileSink::new(
            dir.path(),
            shared(LoggerConfig::default().with_max_file_size_mb(1)),
        );
        sink.write_batch_on(today, &[make_entry("overflow")])
            .expect("write batch");

        assert_eq!(fs::metadata(&base).map(|m| m.len()).ok(), Some(filler as u64));
        let rotated = dir.path().join(file_name_for(today, 1));
        let written = lines(&rotated);
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("sink: overflow"));
    }

    #[test]
    fn full_day_evicts_oldest_file() {
        let dir = TempDir::new().expect("create temp dir");
        let today = day(2024, 6, 1);
        let filler = usize::try_from(BYTES_PER_MB).expect("fits usize");
        let now = SystemTime::now();
        let mut births = HashMap::new();

        // Slot 1 is the oldest; the active file (slot 0) is full.
        for (slot, age) in [(0, 10), (1, 60)] {
            let path = dir.path().join(file_name_for(today, slot));
            fs::write(&path, vec![b'.'; filler]).expect("prefill");
            births.insert(path, now - Duration::from_secs(age));
        }
        let birth_time: BirthTime = Arc::new(move |p: &Path| {
            births
                .get(p)
                .copied()
                .ok_or_else(|| std::io::Error::other("unknown file"))
        });

        let sink = FileSink::with_birth_time(
            dir.path(),
            shared(
                LoggerConfig::default()
                    .with_max_file_size_mb(1)
                    .with_max_files_per_day(2),
            ),
            birth_time,
        );
        sink.write_batch_on(today, &[make_entry("fresh")])
            .expect("write batch");

        let slot1 = lines(&dir.path().join(file_name_for(today, 1)));
        assert_eq!(slot1.len(), 1);
        assert!(slot1[0].ends_with("sink: fresh"));

        let day_files = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(std::result::Result::ok)
            .count();
        assert_eq!(day_files, 2);
    }

    #[test]
    fn write_failure_is_returned() {
        let dir = TempDir::new().expect("create temp dir");
        // A regular file where the log directory should be.
        let blocked = dir.path().join("not-a-dir");
        fs::write(&blocked, b"x").expect("create blocker");

        let sink = FileSink::new(&blocked, shared(LoggerConfig::default()));
        let result = sink.write_batch_on(day(2024, 6, 1), &[make_entry("lost")]);
        assert!(result.is_err());
    }

    #[test]
    fn trait_write_uses_today() {
        let dir = TempDir::new().expect("create temp dir");
        let sink = FileSink::new(dir.path(), shared(LoggerConfig::default()));
        let sink_dyn: &dyn BatchSink = &sink;

        sink_dyn.write_batch(&[make_entry("now")]).expect("write");

        let today = Local::now().date_naive();
        let path = dir.path().join(file_name_for(today, 0));
        assert_eq!(sink.current_file(), Some(path));
        assert_eq!(sink.dir(), dir.path().to_path_buf());
    }
}
