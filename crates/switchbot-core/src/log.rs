//! Append-only status log.
//!
//! The controller writes short human-readable lines here ("command sent to
//! 'Kitchen', status: 0"). It never reads them back; front ends do, to show
//! the user what happened while they were not looking. This is separate from
//! `tracing` diagnostics.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::warn;

/// Destination for status lines.
pub trait LogSink: Send + Sync {
    /// Append one message. Sinks must not fail the caller.
    fn append(&self, message: &str);
}

/// Format a log line as `"<MM-dd HH:mm> <message>"`.
pub fn format_line(at: OffsetDateTime, message: &str) -> Result<String, time::error::Format> {
    let timestamp = at.format(format_description!("[month]-[day] [hour]:[minute]"))?;
    Ok(format!("{} {}", timestamp, message))
}

/// Default location of the log file: `<data dir>/switchbot/switchbot.log`.
pub fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchbot")
        .join("switchbot.log")
}

/// Log sink that appends timestamped lines to a text file.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLog {
    /// Create a sink for `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Sink at [`default_log_path`].
    pub fn open_default() -> Self {
        Self::new(default_log_path())
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every line in the log. A missing file reads as empty.
    pub fn read_lines(&self) -> io::Result<Vec<String>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        BufReader::new(file).lines().collect()
    }

    /// Read the last `count` lines.
    pub fn tail(&self, count: usize) -> io::Result<Vec<String>> {
        let mut lines = self.read_lines()?;
        let skip = lines.len().saturating_sub(count);
        Ok(lines.split_off(skip))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl LogSink for FileLog {
    fn append(&self, message: &str) {
        let line = match format_line(OffsetDateTime::now_utc(), message) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to format log timestamp: {}", e);
                return;
            }
        };
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = self.write_line(&line) {
            warn!("Failed to append to {}: {}", self.path.display(), e);
        }
    }
}

/// Log sink that keeps messages in memory, for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages appended so far, without timestamps.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LogSink for MemoryLog {
    fn append(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

/// Log sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn append(&self, _message: &str) {}
}
