//! Append-only record of what the engine did.
//!
//! Separate from `tracing` diagnostics: audit records are a user-facing
//! history (`vanish.log`), written whether or not a subscriber is installed.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::index::CacheEntry;

pub const TEXT_LOG: &str = "vanish.log";
pub const JSON_LOG: &str = "vanish.json";
/// Records kept in the JSON log
pub const JSON_LOG_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Delete,
    DeleteFail,
    Restore,
    RestoreFail,
    Cleanup,
    Purge,
    ClearAll,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Delete => "DELETE",
            Operation::DeleteFail => "DELETE_FAIL",
            Operation::Restore => "RESTORE",
            Operation::RestoreFail => "RESTORE_FAIL",
            Operation::Cleanup => "CLEANUP",
            Operation::Purge => "PURGE",
            Operation::ClearAll => "CLEAR_ALL",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the file sink records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuditLevel {
    /// Operations and failures, no informational lines
    Error,
    #[default]
    Info,
    /// Also keep the JSON log
    Debug,
}

impl FromStr for AuditLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(AuditLevel::Error),
            "info" => Ok(AuditLevel::Info),
            "debug" => Ok(AuditLevel::Debug),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub operation: Operation,
    /// Original path, or a free-form message for informational records
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl AuditRecord {
    /// Record for an item that was moved, restored or removed.
    pub fn for_entry(operation: Operation, entry: &CacheEntry) -> Self {
        Self {
            timestamp: Local::now(),
            operation,
            path: entry.original_path.display().to_string(),
            cache_path: Some(entry.cache_path.display().to_string()),
            size: entry.size_bytes,
            error: None,
        }
    }

    pub fn failure(operation: Operation, path: &Path, error: impl fmt::Display) -> Self {
        Self {
            timestamp: Local::now(),
            operation,
            path: path.display().to_string(),
            cache_path: None,
            size: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn info(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            operation,
            path: message.into(),
            cache_path: None,
            size: 0,
            error: None,
        }
    }

    pub fn is_info(&self) -> bool {
        self.cache_path.is_none() && self.error.is_none()
    }

    /// Text form, without trailing newline.
    pub fn to_line(&self) -> String {
        let ts = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match (&self.cache_path, &self.error) {
            (_, Some(err)) => format!("{ts} {} {} ERROR: {err}", self.operation, self.path),
            (Some(cache), None) => format!(
                "{ts} {} {} -> {cache} (Size: {} bytes)",
                self.operation, self.path, self.size
            ),
            (None, None) => format!("{ts} {} {}", self.operation, self.path),
        }
    }
}

/// Destination for audit records. Recording never fails the operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Discards everything. Used when logging is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _record: AuditRecord) {}
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.records().iter().map(|r| r.operation).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn record(&self, record: AuditRecord) {
        (**self).record(record)
    }
}

/// Writes `vanish.log`, and at debug level also `vanish.json`.
#[derive(Debug)]
pub struct FileAuditLog {
    dir: PathBuf,
    level: AuditLevel,
    json_limit: usize,
    // Serializes the JSON read-modify-write inside the process
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(dir: impl Into<PathBuf>, level: AuditLevel) -> Self {
        Self {
            dir: dir.into(),
            level,
            json_limit: JSON_LOG_LIMIT,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_json_limit(mut self, limit: usize) -> Self {
        self.json_limit = limit;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, record: &AuditRecord) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(TEXT_LOG))?;
        writeln!(file, "{}", record.to_line())?;

        if self.level == AuditLevel::Debug {
            self.append_json(record)?;
        }
        Ok(())
    }

    fn append_json(&self, record: &AuditRecord) -> io::Result<()> {
        let path = self.dir.join(JSON_LOG);
        let mut records = match fs::read(&path) {
            Ok(data) => serde_json::from_slice::<Vec<AuditRecord>>(&data).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "discarding unreadable JSON log");
                Vec::new()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err),
        };

        records.push(record.clone());
        if records.len() > self.json_limit {
            let excess = records.len() - self.json_limit;
            records.drain(..excess);
        }

        let data = serde_json::to_vec_pretty(&records).map_err(io::Error::other)?;
        fs::write(&path, data)
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, record: AuditRecord) {
        if self.level == AuditLevel::Error && record.is_info() {
            return;
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = self.write(&record) {
            tracing::warn!(
                dir = %self.dir.display(),
                operation = %record.operation,
                error = %err,
                "failed to write audit record"
            );
        }
    }
}

/// Aggregate view over the JSON log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditSummary {
    pub total_operations: usize,
    pub by_operation: BTreeMap<String, usize>,
    pub total_size: u64,
    pub first: Option<DateTime<Local>>,
    pub last: Option<DateTime<Local>>,
}

/// Summarize `<dir>/vanish.json`. Only populated at debug level.
pub fn summarize(dir: &Path) -> io::Result<AuditSummary> {
    let data = fs::read(dir.join(JSON_LOG))?;
    let records: Vec<AuditRecord> = serde_json::from_slice(&data).map_err(io::Error::other)?;

    let mut summary = AuditSummary {
        total_operations: records.len(),
        first: records.first().map(|r| r.timestamp),
        last: records.last().map(|r| r.timestamp),
        ..Default::default()
    };
    for r in &records {
        *summary
            .by_operation
            .entry(r.operation.as_str().to_string())
            .or_insert(0) += 1;
        summary.total_size += r.size;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry() -> CacheEntry {
        CacheEntry {
            id: "42".to_string(),
            original_path: PathBuf::from("/tmp/a.txt"),
            delete_time: Utc::now(),
            cache_path: PathBuf::from("/c/42-a.txt"),
            is_directory: false,
            file_count: 0,
            size_bytes: 10,
            protected: false,
            backup_path: None,
        }
    }

    fn fixed(mut record: AuditRecord) -> AuditRecord {
        record.timestamp = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        record
    }

    #[test]
    fn test_line_formats() {
        let moved = fixed(AuditRecord::for_entry(Operation::Delete, &entry()));
        assert_eq!(
            moved.to_line(),
            "2024-05-06 07:08:09 DELETE /tmp/a.txt -> /c/42-a.txt (Size: 10 bytes)"
        );

        let info = fixed(AuditRecord::info(Operation::ClearAll, "Cache cleared"));
        assert_eq!(info.to_line(), "2024-05-06 07:08:09 CLEAR_ALL Cache cleared");

        let failed = fixed(AuditRecord::failure(
            Operation::DeleteFail,
            Path::new("/tmp/b"),
            "permission denied",
        ));
        assert_eq!(
            failed.to_line(),
            "2024-05-06 07:08:09 DELETE_FAIL /tmp/b ERROR: permission denied"
        );
    }

    #[test]
    fn test_file_log_appends_lines() {
        let temp = TempDir::new().unwrap();
        let log = FileAuditLog::new(temp.path().join("logs"), AuditLevel::Info);

        log.record(AuditRecord::for_entry(Operation::Delete, &entry()));
        log.record(AuditRecord::for_entry(Operation::Restore, &entry()));

        let text = fs::read_to_string(temp.path().join("logs").join(TEXT_LOG)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" DELETE /tmp/a.txt -> "));
        assert!(lines[1].contains(" RESTORE /tmp/a.txt -> "));
        // No JSON below debug
        assert!(!temp.path().join("logs").join(JSON_LOG).exists());
    }

    #[test]
    fn test_error_level_skips_info_records() {
        let temp = TempDir::new().unwrap();
        let log = FileAuditLog::new(temp.path(), AuditLevel::Error);

        log.record(AuditRecord::info(Operation::ClearAll, "Cache cleared"));
        log.record(AuditRecord::failure(Operation::DeleteFail, Path::new("/x"), "boom"));

        let text = fs::read_to_string(temp.path().join(TEXT_LOG)).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("DELETE_FAIL"));
    }

    #[test]
    fn test_debug_level_keeps_bounded_json() {
        let temp = TempDir::new().unwrap();
        let log = FileAuditLog::new(temp.path(), AuditLevel::Debug).with_json_limit(5);

        for _ in 0..8 {
            log.record(AuditRecord::for_entry(Operation::Delete, &entry()));
        }
        log.record(AuditRecord::for_entry(Operation::Purge, &entry()));

        let summary = summarize(temp.path()).unwrap();
        assert_eq!(summary.total_operations, 5);
        assert_eq!(summary.by_operation["PURGE"], 1);
        assert_eq!(summary.by_operation["DELETE"], 4);
        assert_eq!(summary.total_size, 50);
        // Text log is never truncated
        let text = fs::read_to_string(temp.path().join(TEXT_LOG)).unwrap();
        assert_eq!(text.lines().count(), 9);
        assert!(summary.first <= summary.last);
    }

    #[test]
    fn test_summarize_without_json_log() {
        let temp = TempDir::new().unwrap();
        let err = summarize(temp.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unwritable_dir_does_not_panic() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let log = FileAuditLog::new(blocker.join("logs"), AuditLevel::Debug);
        log.record(AuditRecord::info(Operation::ClearAll, "Cache cleared"));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("DEBUG".parse::<AuditLevel>().unwrap(), AuditLevel::Debug);
        assert_eq!("info".parse::<AuditLevel>().unwrap(), AuditLevel::Info);
        assert!("verbose".parse::<AuditLevel>().is_err());
    }
}
