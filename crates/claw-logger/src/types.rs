//! Core types for the logger.
//!
//! This module provides:
//! - [`LogLevel`] — Severity levels for log entries
//! - [`LogEntry`] — A single immutable log event

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Timestamp layout shared by console and file output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum LogLevel {
    /// General information
    Info = 0,
    /// Warning conditions
    Warn = 1,
    /// Error conditions
    Error = 2,
    /// Unrecoverable failures
    Fatal = 3,
}

impl LogLevel {
    /// All levels in ascending severity.
    pub const ALL: [Self; 4] = [Self::Info, Self::Warn, Self::Error, Self::Fatal];

    /// Returns true if this level is at least as severe as the given level.
    #[must_use]
    pub fn is_at_least(&self, level: Self) -> bool {
        *self >= level
    }

    /// Returns the name written between brackets in output lines.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warn => "Warn",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// Entries at this level go to stderr rather than stdout.
    #[must_use]
    pub fn uses_error_stream(&self) -> bool {
        self.is_at_least(Self::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(LogError::InvalidLevel(s.to_string())),
        }
    }
}

/// A single log event, captured at the call site and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the event was captured
    pub timestamp: DateTime<Local>,
    /// Severity level
    pub level: LogLevel,
    /// The log message, if any
    pub message: Option<String>,
    /// Name of the logger that produced the entry
    pub source: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current wall-clock time.
    #[must_use]
    pub fn now(level: LogLevel, message: Option<String>, source: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message,
            source: source.into(),
        }
    }

    /// Formats the entry as `"<timestamp> [<level>] <source>: <message>"`.
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{} [{}] {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.source,
            self.message.as_deref().unwrap_or_default()
        )
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_line())
    }
}
