//! Execution log collaborators.
//!
//! The pipeline records one event per completed stage through an injected
//! [`ExecutionRecorder`]. Nothing is written unless the caller supplies a
//! recorder that writes.

use crate::error::{Result, ResultExt};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Timestamp layout of execution log lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receives pipeline execution events.
pub trait ExecutionRecorder: Send + Sync {
    /// Record that `event` happened, with a short human-readable detail.
    fn record(&self, event: &str, detail: &str);
}

/// Append-only text log, one `[timestamp] event: detail` line per event.
#[derive(Debug, Clone)]
pub struct FileExecutionLog {
    path: PathBuf,
}

impl FileExecutionLog {
    /// Use `path` as the log file, creating its parent directory.
    ///
    /// Existing content is kept; new events are appended.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .context(format!("Failed to create log directory {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl ExecutionRecorder for FileExecutionLog {
    fn record(&self, event: &str, detail: &str) {
        let line = format_entry(&Local::now().format(TIMESTAMP_FORMAT).to_string(), event, detail);
        // A failed log write must not abort the run
        if let Err(e) = self.append(&line) {
            warn!("Failed to append to {}: {}", self.path.display(), e);
        }
    }
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl ExecutionRecorder for TracingRecorder {
    fn record(&self, event: &str, detail: &str) {
        info!(event = %event, "{}", detail);
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<(String, String)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(event, detail)` pairs in order.
    pub fn events(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExecutionRecorder for MemoryRecorder {
    fn record(&self, event: &str, detail: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event.to_string(), detail.to_string()));
    }
}

fn format_entry(timestamp: &str, event: &str, detail: &str) -> String {
    format!("[{}] {}: {}", timestamp, event, detail)
}

static_assertions::assert_impl_all!(FileExecutionLog: Send, Sync);
static_assertions::assert_impl_all!(MemoryRecorder: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        assert_eq!(
            format_entry("2024-01-02 03:04:05", "cleaning", "3333 -> 3330 rows"),
            "[2024-01-02 03:04:05] cleaning: 3333 -> 3330 rows"
        );
    }

    #[test]
    fn test_file_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outputs").join("execution_log.txt");
        let log = FileExecutionLog::new(&path).unwrap();

        log.record("inspection", "100 rows");
        log.record("cleaning", "98 rows kept");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] inspection: 100 rows"));
        assert!(lines[1].ends_with("] cleaning: 98 rows kept"));

        let timestamp = &lines[0][1..20];
        assert!(NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_file_log_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "earlier run\n").unwrap();

        FileExecutionLog::new(&path).unwrap().record("complete", "ok");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier run\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_memory_recorder() {
        let recorder = MemoryRecorder::new();
        recorder.record("a", "1");
        recorder.record("b", "2");
        assert_eq!(
            recorder.events(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }
}
