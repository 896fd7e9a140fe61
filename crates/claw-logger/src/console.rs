//! Synchronous console output.
//!
//! This module provides:
//! - [`ConsoleSink`] — Writes formatted entries to stdout/stderr on the calling thread
//! - [`ColorTable`] — Level to color-pair mapping
//! - [`ColorPair`] — Foreground/background colors for one level

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};

use crate::types::{LogEntry, LogLevel};

/// Foreground and background colors applied to one console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    /// Text color
    pub foreground: Color,
    /// Background color
    pub background: Color,
}

impl ColorPair {
    /// Creates a color pair.
    #[must_use]
    pub const fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground,
            background,
        }
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self::new(Color::Reset, Color::Reset)
    }
}

/// Mapping from level to console colors.
///
/// Levels missing from the table are written with [`ColorPair::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    pairs: HashMap<LogLevel, ColorPair>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::empty()
            .with(LogLevel::Info, ColorPair::new(Color::Green, Color::Reset))
            .with(LogLevel::Warn, ColorPair::new(Color::Yellow, Color::Reset))
            .with(LogLevel::Error, ColorPair::new(Color::Red, Color::Reset))
            .with(LogLevel::Fatal, ColorPair::new(Color::White, Color::DarkRed))
    }
}

impl ColorTable {
    /// Creates a table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pairs: HashMap::new(),
        }
    }

    /// Sets the colors for a level.
    #[must_use]
    pub fn with(mut self, level: LogLevel, pair: ColorPair) -> Self {
        self.pairs.insert(level, pair);
        self
    }

    /// Returns the colors for a level, or the default pair.
    #[must_use]
    pub fn get(&self, level: LogLevel) -> ColorPair {
        self.pairs.get(&level).copied().unwrap_or_default()
    }
}

/// Resets terminal colors when dropped, whatever path leaves the scope.
struct ColorGuard<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> ColorGuard<'a, W> {
    fn apply(out: &'a mut W, pair: ColorPair) -> io::Result<Self> {
        let mut guard = Self { out };
        queue!(
            guard.out,
            SetForegroundColor(pair.foreground),
            SetBackgroundColor(pair.background)
        )?;
        Ok(guard)
    }

    fn writer(&mut self) -> &mut W {
        self.out
    }
}

impl<W: Write> Drop for ColorGuard<'_, W> {
    fn drop(&mut self) {
        let _ = queue!(self.out, ResetColor);
        let _ = self.out.flush();
    }
}

/// Writes entries to the console synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a console sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Writes an entry to stderr (Error and above) or stdout.
    ///
    /// Write failures are ignored; console output is best effort.
    pub fn emit(&self, entry: &LogEntry, colors: Option<ColorPair>) {
        let _ = if entry.level.uses_error_stream() {
            self.render(&mut io::stderr().lock(), entry, colors)
        } else {
            self.render(&mut io::stdout().lock(), entry, colors)
        };
    }

    /// Renders one entry line into `out`, colored when a pair is given.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        entry: &LogEntry,
        colors: Option<ColorPair>,
    ) -> io::Result<()> {
        let line = entry.format_line();
        match colors {
            Some(pair) => {
                let mut guard = ColorGuard::apply(out, pair)?;
                queue!(guard.writer(), Print(line))?;
                // Reset before the newline so the background does not bleed.
                drop(guard);
                writeln!(out)?;
            }
            None => writeln!(out, "{line}")?,
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn make_entry(level: LogLevel) -> LogEntry {
        LogEntry {
            timestamp: Local
                .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
                .single()
                .expect("unambiguous local time"),
            level,
            message: Some("hello".to_string()),
            source: "node".to_string(),
        }
    }

    fn render(entry: &LogEntry, colors: Option<&ColorTable>) -> String {
        let mut out = Vec::new();
        ConsoleSink::new()
            .render(&mut out, entry, colors.map(|table| table.get(entry.level)))
            .expect("render to vec");
        String::from_utf8(out).expect("utf8 output")
    }

    /// Writer that fails after accepting a fixed number of writes.
    struct FailingWriter {
        accepted: Vec<u8>,
        remaining_ok: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining_ok == 0 {
                return Err(io::Error::other("console gone"));
            }
            self.remaining_ok -= 1;
            self.accepted.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn plain_render_is_exact_line() {
        let out = render(&make_entry(LogLevel::Info), None);
        assert_eq!(out, "2024-01-02 03:04:05.000 [Info] node: hello\n");
    }

    #[test]
    fn colored_render_wraps_line_in_color_codes() {
        let table = ColorTable::default();
        let out = render(&make_entry(LogLevel::Error), Some(&table));

        assert!(out.starts_with("\u{1b}["));
        assert!(out.contains("[Error] node: hello"));
        assert!(out.ends_with("\u{1b}[0m\n"));
    }

    #[test]
    fn missing_level_uses_default_pair() {
        let table = ColorTable::empty();
        assert_eq!(table.get(LogLevel::Warn), ColorPair::default());

        let out = render(&make_entry(LogLevel::Warn), Some(&table));
        assert!(out.contains("[Warn] node: hello"));
    }

    #[test]
    fn color_table_overrides_level() {
        let pair = ColorPair::new(Color::Blue, Color::Black);
        let table = ColorTable::default().with(LogLevel::Info, pair);
        assert_eq!(table.get(LogLevel::Info), pair);
        assert_eq!(
            table.get(LogLevel::Error),
            ColorPair::new(Color::Red, Color::Reset)
        );
    }

    #[test]
    fn default_table_covers_every_level() {
        let table = ColorTable::default();
        for level in LogLevel::ALL {
            assert_ne!(table.get(level), ColorPair::default());
        }
    }

    #[test]
    fn color_reset_runs_on_error_path() {
        let table = ColorTable::default();
        let mut out = FailingWriter {
            accepted: Vec::new(),
            remaining_ok: 2,
        };

        let result = ConsoleSink::new().render(
            &mut out,
            &make_entry(LogLevel::Info),
            Some(table.get(LogLevel::Info)),
        );
        assert!(result.is_err());
        // Only the color setup reached the writer before the failure.
        assert!(out.accepted.starts_with(b"\x1b["));
    }
}
