//! Parsed form of a recording file.

use crate::errors::SyncError;
use crate::types::{split_field_values, FieldValue};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRecordItem {
    pub object_id: String,
    pub fields: Vec<FieldValue>,
    /// Precheck status text exactly as recorded.
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLine {
    Set {
        key: String,
        fields: Vec<FieldValue>,
    },
    BulkSet {
        object_type: String,
        items: Vec<BulkRecordItem>,
    },
    Response {
        status: String,
        fields: Vec<FieldValue>,
    },
    /// `G|<status>` with no payload: the wait got no response.
    NoResponse { status: String },
}

impl RecordLine {
    pub fn parse(line: &str) -> Result<Self, SyncError> {
        let (kind, rest) = line
            .split_once('|')
            .ok_or_else(|| SyncError::Recording(format!("missing line kind: `{line}`")))?;
        match kind {
            "s" => {
                let (key, fields) = rest.split_once('|').unwrap_or((rest, ""));
                Ok(Self::Set {
                    key: key.to_string(),
                    fields: split_field_values(fields)?,
                })
            }
            "S" => parse_bulk_set(rest),
            "G" => match rest.split_once('|') {
                Some((status, fields)) => Ok(Self::Response {
                    status: status.to_string(),
                    fields: split_field_values(fields)?,
                }),
                None => Ok(Self::NoResponse {
                    status: rest.to_string(),
                }),
            },
            other => Err(SyncError::Recording(format!("unknown line kind `{other}`"))),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::BulkSet { .. })
    }
}

// `<type>||<id>|<f>=<v>...|<status>||<id>|...`
fn parse_bulk_set(rest: &str) -> Result<RecordLine, SyncError> {
    let mut segments = rest.split("||");
    let object_type = segments.next().unwrap_or_default().to_string();
    let items = segments
        .map(|segment| {
            let (object_id, tail) = segment.split_once('|').ok_or_else(|| {
                SyncError::Recording(format!("bulk item without status: `{segment}`"))
            })?;
            let (attrs, status) = tail.rsplit_once('|').unwrap_or(("", tail));
            Ok(BulkRecordItem {
                object_id: object_id.to_string(),
                fields: split_field_values(attrs)?,
                status: status.to_string(),
            })
        })
        .collect::<Result<Vec<_>, SyncError>>()?;
    Ok(RecordLine::BulkSet { object_type, items })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSummary {
    pub sets: usize,
    pub bulk_sets: usize,
    pub responses: usize,
    pub no_responses: usize,
}

/// A parsed recording, ready for replay.
#[derive(Debug, Clone)]
pub struct SessionRecording {
    raw_lines: Vec<String>,
    lines: Vec<RecordLine>,
}

impl SessionRecording {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Io(format!("{}: {e}", path.display())))?;
        Self::parse(&raw)
    }

    pub fn parse(text: &str) -> Result<Self, SyncError> {
        let mut raw_lines = Vec::new();
        let mut lines = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = RecordLine::parse(line).map_err(|e| {
                SyncError::Recording(format!("recording line {}: {e}", idx + 1))
            })?;
            raw_lines.push(line.to_string());
            lines.push(parsed);
        }
        Ok(Self { raw_lines, lines })
    }

    pub fn lines(&self) -> &[RecordLine] {
        &self.lines
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    pub fn requests(&self) -> impl Iterator<Item = &RecordLine> {
        self.lines.iter().filter(|line| line.is_request())
    }

    /// Recorded wait outcomes, in order.
    pub fn outcomes(&self) -> impl Iterator<Item = &RecordLine> {
        self.lines.iter().filter(|line| !line.is_request())
    }

    pub fn summary(&self) -> RecordingSummary {
        let mut summary = RecordingSummary::default();
        for line in &self.lines {
            match line {
                RecordLine::Set { .. } => summary.sets += 1,
                RecordLine::BulkSet { .. } => summary.bulk_sets += 1,
                RecordLine::Response { .. } => summary.responses += 1,
                RecordLine::NoResponse { .. } => summary.no_responses += 1,
            }
        }
        summary
    }

    /// Hex SHA-256 over the newline-terminated lines.
    pub fn fingerprint(&self) -> String {
        fingerprint_lines(&self.raw_lines)
    }
}

pub fn fingerprint_lines(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
