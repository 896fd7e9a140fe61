//! Active file selection and rotation.
//!
//! Files are named `<yyyy-mm-dd>.log` (slot 0) and `<yyyy-mm-dd>_<n>.log`
//! (slot `n >= 1`). The active file switches when the calendar date changes
//! and advances to another same-day slot when the size cap would be
//! exceeded. When every same-day slot is taken, the oldest file is deleted
//! and its slot reused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;

/// Extension of every log file.
pub const LOG_EXTENSION: &str = "log";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads the time a file came into existence.
pub(crate) type BirthTime = Arc<dyn Fn(&Path) -> io::Result<SystemTime> + Send + Sync>;

/// Creation time of a file, or its modification time where the platform
/// does not record creation.
pub(crate) fn file_birth(path: &Path) -> io::Result<SystemTime> {
    let meta = fs::metadata(path)?;
    meta.created().or_else(|_| meta.modified())
}

pub(crate) fn default_birth_time() -> BirthTime {
    Arc::new(file_birth)
}

/// Returns the file name for a date and same-day slot.
#[must_use]
pub fn file_name_for(date: NaiveDate, slot: u32) -> String {
    let day = date.format(DATE_FORMAT);
    if slot == 0 {
        format!("{day}.{LOG_EXTENSION}")
    } else {
        format!("{day}_{slot}.{LOG_EXTENSION}")
    }
}

/// Parses a log file name back into its date and slot.
#[must_use]
pub fn parse_file_name(name: &str) -> Option<(NaiveDate, u32)> {
    let stem = name.strip_suffix(LOG_EXTENSION)?.strip_suffix('.')?;
    let (day, slot) = match stem.split_once('_') {
        Some((day, digits)) => {
            let slot: u32 = digits.parse().ok()?;
            // Only the canonical spelling counts: no zero slot, no padding.
            if slot == 0 || slot.to_string() != digits {
                return None;
            }
            (day, slot)
        }
        None => (stem, 0),
    };
    if day.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(day, DATE_FORMAT).ok()?;
    Some((date, slot))
}

/// The file currently receiving writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFile {
    /// Full path of the file.
    pub path: PathBuf,
    /// Calendar date the file belongs to.
    pub date: NaiveDate,
    /// Same-day slot (0 for the base file).
    pub slot: u32,
    /// Bytes in the file, as tracked by this logger.
    pub size: u64,
}

/// Chooses the active file for each write.
pub struct RotationManager {
    dir: PathBuf,
    active: Option<ActiveFile>,
    birth_time: BirthTime,
}

impl std::fmt::Debug for RotationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationManager")
            .field("dir", &self.dir)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl RotationManager {
    /// Creates a manager for the given log directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_birth_time(dir, default_birth_time())
    }

    pub(crate) fn with_birth_time(dir: impl Into<PathBuf>, birth_time: BirthTime) -> Self {
        Self {
            dir: dir.into(),
            active: None,
            birth_time,
        }
    }

    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file currently receiving writes.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveFile> {
        self.active.as_ref()
    }

    /// Returns the path for a date and slot in this manager's directory.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate, slot: u32) -> PathBuf {
        self.dir.join(file_name_for(date, slot))
    }

    /// Picks the file the next `incoming` bytes go to.
    ///
    /// Switches to `today`'s base file on a date change, then rotates if the
    /// non-empty active file would grow past `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an evicted
    /// file cannot be removed.
    pub fn prepare(
        &mut self,
        today: NaiveDate,
        incoming: u64,
        max_bytes: u64,
        max_files: u32,
    ) -> Result<&ActiveFile> {
        fs::create_dir_all(&self.dir)?;

        let stale = self.active.as_ref().is_none_or(|a| a.date != today);
        if stale {
            let path = self.path_for(today, 0);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            debug!(path = %path.display(), size, "opening day file");
            self.active = Some(ActiveFile {
                path,
                date: today,
                slot: 0,
                size,
            });
        }

        let needs_rotation = self
            .active
            .as_ref()
            .is_some_and(|a| a.size > 0 && a.size.saturating_add(incoming) > max_bytes);
        if needs_rotation {
            self.rotate(today, max_files)?;
        }

        self.active.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no active log file").into()
        })
    }

    /// Advances to a free same-day slot.
    ///
    /// Every same-day file counts toward `max_files`, whatever its slot, so
    /// a cap lowered at runtime is enforced here. Oldest files are evicted
    /// until one more fits.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or an evicted file
    /// cannot be removed.
    pub fn rotate(&mut self, today: NaiveDate, max_files: u32) -> Result<&ActiveFile> {
        let mut existing = self.same_day_files(today)?;
        while existing.len() >= max_files.max(1) as usize {
            let oldest = self.oldest(&existing);
            let (slot, path) = existing.swap_remove(oldest);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            debug!(path = %path.display(), slot, "evicted oldest same-day log file");
        }

        // Fewer than `max_files` remain, so a slot below the cap is free.
        let slot = (0..max_files)
            .find(|slot| existing.iter().all(|(taken, _)| taken != slot))
            .unwrap_or(0);
        let path = self.path_for(today, slot);
        debug!(path = %path.display(), slot, "rotated log file");
        Ok(&*self.active.insert(ActiveFile {
            path,
            date: today,
            slot,
            size: 0,
        }))
    }

    /// Records bytes appended to the active file.
    pub fn record_write(&mut self, bytes: u64) {
        if let Some(active) = self.active.as_mut() {
            active.size = active.size.saturating_add(bytes);
        }
    }

    /// Counts the log files on disk for `date`, in any slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn files_for_day(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.same_day_files(date)?.len())
    }

    fn same_day_files(&self, date: NaiveDate) -> Result<Vec<(u32, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some((day, slot)) = parse_file_name(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            if day == date && entry.path().is_file() {
                files.push((slot, entry.path()));
            }
        }
        Ok(files)
    }

    /// Index of the file created first. Unreadable times sort first so a
    /// broken file is the one replaced.
    fn oldest(&self, files: &[(u32, PathBuf)]) -> usize {
        files
            .iter()
            .enumerate()
            .min_by_key(|(_, (slot, path))| {
                let born = (self.birth_time)(path.as_path()).unwrap_or(SystemTime::UNIX_EPOCH);
                (born, *slot)
            })
            .map_or(0, |(index, _)| index)
    }
}
