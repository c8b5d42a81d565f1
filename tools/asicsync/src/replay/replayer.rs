//! Replay infrastructure: serve recorded responses and re-drive recorded
//! requests deterministically.

use crate::channel::{Channel, InboundMessage, RawMessage, Readiness, OP_BULK_SET, OP_SET};
use crate::client::{payload_items, ItemOutcome, SyncClient};
use crate::config::ClientConfig;
use crate::encoder::ListAttributeEncoder;
use crate::errors::SyncError;
use crate::replay::recorder::{MemoryRecordSink, Recorder};
use crate::replay::recording::{BulkRecordItem, RecordLine, SessionRecording};
use crate::types::{join_field_values, FieldValue, ObjectType, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mismatch between a recorded request and the one published during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMismatch {
    pub position: usize,
    pub expected: Option<RawMessage>,
    pub actual: Option<RawMessage>,
}

/// Channel that answers each wait with the next recorded outcome. A recorded
/// `G|<status>` without payload replays as a readiness timeout.
pub struct ReplayChannel {
    outcomes: Mutex<VecDeque<RecordLine>>,
    ready: Mutex<Option<RawMessage>>,
    expected_requests: Vec<RawMessage>,
    actual_requests: Mutex<Vec<RawMessage>>,
}

impl ReplayChannel {
    pub fn from_recording(recording: &SessionRecording) -> Result<Self, SyncError> {
        let expected_requests = recording
            .requests()
            .filter_map(|line| expected_publish(line).transpose())
            .collect::<Result<Vec<_>, SyncError>>()?;
        Ok(Self {
            outcomes: Mutex::new(recording.outcomes().cloned().collect()),
            ready: Mutex::new(None),
            expected_requests,
            actual_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn actual_requests(&self) -> Vec<RawMessage> {
        lock(&self.actual_requests).clone()
    }

    pub fn remaining_outcomes(&self) -> usize {
        lock(&self.outcomes).len()
    }

    /// After replay, compare what was published with what the recording
    /// implies should have been published.
    pub fn verify_request_alignment(&self) -> Vec<RequestMismatch> {
        let actual = lock(&self.actual_requests);
        let len = actual.len().max(self.expected_requests.len());
        (0..len)
            .filter_map(|position| {
                let expected = self.expected_requests.get(position);
                let found = actual.get(position);
                if expected == found {
                    None
                } else {
                    Some(RequestMismatch {
                        position,
                        expected: expected.cloned(),
                        actual: found.cloned(),
                    })
                }
            })
            .collect()
    }
}

impl Channel for ReplayChannel {
    fn publish(&self, key: &str, fields: &[FieldValue], op: &str) {
        lock(&self.actual_requests).push(RawMessage::new(op, key, fields.to_vec()));
    }

    fn wait_ready(&self, _timeout: Duration) -> Readiness {
        let next = lock(&self.outcomes).pop_front();
        match next {
            Some(RecordLine::Response { status, fields }) => {
                *lock(&self.ready) = Some(RawMessage::response_raw(status, fields));
                Readiness::Ready
            }
            _ => Readiness::Timeout,
        }
    }

    fn pop_next(&self) -> Option<InboundMessage> {
        lock(&self.ready).take().map(InboundMessage::decode)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// What the client publishes for a recorded request; `None` for an
// all-rejected batch, which is never sent.
fn expected_publish(line: &RecordLine) -> Result<Option<RawMessage>, SyncError> {
    match line {
        RecordLine::Set { key, fields } => Ok(Some(RawMessage::new(OP_SET, key, fields.clone()))),
        RecordLine::BulkSet { object_type, items } => {
            let outcomes = bulk_outcomes(items)?;
            let payload = payload_items(&outcomes);
            if payload.is_empty() {
                return Ok(None);
            }
            let key = format!("{object_type}:{}", payload.len());
            Ok(Some(RawMessage::new(OP_BULK_SET, key, payload)))
        }
        RecordLine::Response { .. } | RecordLine::NoResponse { .. } => Ok(None),
    }
}

fn bulk_outcomes(items: &[BulkRecordItem]) -> Result<Vec<ItemOutcome>, SyncError> {
    items
        .iter()
        .map(|item| {
            Ok(ItemOutcome {
                object_id: item.object_id.clone(),
                encoded_attributes: join_field_values(&item.fields),
                precheck_status: item.status.parse::<StatusCode>()?,
            })
        })
        .collect()
}

// ── Reissue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReissueReport {
    pub statuses: Vec<StatusCode>,
    pub regenerated: Vec<String>,
    pub mismatches: Vec<RequestMismatch>,
    pub identical: bool,
}

/// Re-drives every recorded request through a [`SyncClient`] backed by a
/// [`ReplayChannel`] and re-records the session. A faithful recording
/// reproduces itself line for line.
pub fn reissue_recording(recording: &SessionRecording) -> Result<ReissueReport, SyncError> {
    let channel = Arc::new(ReplayChannel::from_recording(recording)?);
    let sink = MemoryRecordSink::default();
    // Sync mode leaves a G line behind every request; without any, the
    // session ran fire-and-forget.
    let config = ClientConfig {
        sync_mode: recording.outcomes().next().is_some(),
        ..ClientConfig::default()
    };
    let client = SyncClient::new(
        &config,
        channel.clone(),
        Arc::new(ListAttributeEncoder),
        Recorder::with_sink(Arc::new(sink.clone())),
    );

    let mut statuses = Vec::new();
    for line in recording.requests() {
        let status = match line {
            RecordLine::Set { key, fields } => client.submit_set(key, fields),
            RecordLine::BulkSet { object_type, items } => {
                let object_type = object_type.parse::<ObjectType>()?;
                client.submit_bulk_set(object_type, &bulk_outcomes(items)?)
            }
            RecordLine::Response { .. } | RecordLine::NoResponse { .. } => continue,
        };
        statuses.push(status);
    }

    let regenerated = sink.lines();
    let identical = regenerated.as_slice() == recording.raw_lines();
    Ok(ReissueReport {
        statuses,
        mismatches: channel.verify_request_alignment(),
        regenerated,
        identical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_channel_serves_outcomes_in_order() {
        let recording =
            SessionRecording::parse("s|PORT:oid:0x1|a=1\nG|SUCCESS|x=1\ns|PORT:oid:0x2|a=2\nG|FAILURE\n")
                .expect("parse");
        let channel = ReplayChannel::from_recording(&recording).expect("channel");

        assert_eq!(channel.wait_ready(Duration::from_secs(1)), Readiness::Ready);
        assert!(matches!(
            channel.pop_next(),
            Some(InboundMessage::GetResponse { status: StatusCode::Success, .. })
        ));
        assert_eq!(channel.wait_ready(Duration::from_secs(1)), Readiness::Timeout);
        assert_eq!(channel.remaining_outcomes(), 0);
        assert_eq!(channel.wait_ready(Duration::from_secs(1)), Readiness::Timeout);
    }

    #[test]
    fn alignment_reports_divergent_and_missing_requests() {
        let recording = SessionRecording::parse("s|PORT:oid:0x1|a=1\ns|PORT:oid:0x2|a=2\n")
            .expect("parse");
        let channel = ReplayChannel::from_recording(&recording).expect("channel");
        channel.publish("PORT:oid:0x1", &[("a".to_string(), "9".to_string())], OP_SET);

        let mismatches = channel.verify_request_alignment();
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].position, 0);
        assert!(mismatches[1].actual.is_none());
    }

    #[test]
    fn all_rejected_batches_expect_no_publish() {
        let recording =
            SessionRecording::parse("S|FDB_ENTRY||a|x=1|FAILURE\nG|SUCCESS|\n").expect("parse");
        let report = reissue_recording(&recording).expect("reissue");
        assert!(report.mismatches.is_empty());
        assert!(report.identical);
        assert_eq!(report.statuses, vec![StatusCode::Success]);
    }
}
