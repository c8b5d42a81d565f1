//! Appends one canonical text line per request and response.
//!
//! Line kinds:
//! - `s|<key>|<f>=<v>|...` single set
//! - `S|<type>||<id>|<f>=<v>...|<status>||<id>|...` bulk set
//! - `G|<status>|<f>=<v>|...` response
//! - `G|<status>` no response

use crate::config::RecordingConfig;
use crate::errors::SyncError;
use crate::types::{join_field_values, FieldValue, StatusCode};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait RecordSink: Send + Sync {
    fn append_line(&self, line: &str) -> Result<(), SyncError>;
}

// ── FileRecordSink ────────────────────────────────────────────────────────────

pub struct FileRecordSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecordSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SyncError::Io(e.to_string()))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileRecordSink {
    fn append_line(&self, line: &str) -> Result<(), SyncError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SyncError::Recording("record write lock poisoned".to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SyncError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| SyncError::Io(e.to_string()))
    }
}

// ── MemoryRecordSink ──────────────────────────────────────────────────────────

#[derive(Default, Clone)]
pub struct MemoryRecordSink {
    lines: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryRecordSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines lock").clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("fail lock") = fail;
    }
}

impl RecordSink for MemoryRecordSink {
    fn append_line(&self, line: &str) -> Result<(), SyncError> {
        if *self.fail_writes.lock().expect("fail lock") {
            return Err(SyncError::Io("record sink unavailable".to_string()));
        }
        self.lines
            .lock()
            .expect("lines lock")
            .push(line.to_string());
        Ok(())
    }
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// Best-effort observer: write errors are logged and never reach the caller.
#[derive(Clone, Default)]
pub struct Recorder {
    sink: Option<Arc<dyn RecordSink>>,
}

impl Recorder {
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn with_sink(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn from_config(config: &RecordingConfig) -> Result<Self, SyncError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let sink = FileRecordSink::open(&config.path)?;
        tracing::info!(path = %sink.path().display(), "recording enabled");
        Ok(Self::with_sink(Arc::new(sink)))
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn record_set(&self, key: &str, fields: &[FieldValue]) {
        self.emit(|| format_set_line(key, fields));
    }

    /// `audit` is only evaluated when a sink is attached.
    pub fn record_bulk_set(&self, object_type: &str, audit: impl FnOnce() -> Vec<FieldValue>) {
        self.emit(|| format_bulk_set_line(object_type, &audit()));
    }

    pub fn record_response(&self, raw_status: &str, fields: &[FieldValue]) {
        self.emit(|| format_response_line(raw_status, fields));
    }

    pub fn record_failure(&self, status: StatusCode) {
        self.emit(|| format_failure_line(status));
    }

    // Lines are only built when a sink is present.
    fn emit(&self, line: impl FnOnce() -> String) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if let Err(err) = sink.append_line(&line()) {
            tracing::warn!(error = %err, "failed to append record line");
        }
    }
}

pub fn format_set_line(key: &str, fields: &[FieldValue]) -> String {
    format!("s|{key}|{}", join_field_values(fields))
}

/// `audit` holds `(object id, "<f>=<v>|...|<status>")` pairs.
pub fn format_bulk_set_line(object_type: &str, audit: &[FieldValue]) -> String {
    let mut line = format!("S|{object_type}");
    for (object_id, attrs_with_status) in audit {
        line.push_str("||");
        line.push_str(object_id);
        line.push('|');
        line.push_str(attrs_with_status);
    }
    line
}

pub fn format_response_line(raw_status: &str, fields: &[FieldValue]) -> String {
    format!("G|{raw_status}|{}", join_field_values(fields))
}

pub fn format_failure_line(status: StatusCode) -> String {
    format!("G|{status}")
}
