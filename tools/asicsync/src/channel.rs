//! The publish/consume seam between the request builders and the remote agent.
//!
//! A [`Channel`] only knows how to push a request out and hand back whatever
//! arrives next. Inbound tuples are decoded once, here, into [`InboundMessage`]
//! so nothing downstream compares operation strings.

use crate::types::{FieldValue, StatusCode};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OP_SET: &str = "set";
pub const OP_BULK_SET: &str = "bulkset";
pub const OP_GET_RESPONSE: &str = "getresponse";

/// `(op, key, fields)` exactly as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub op: String,
    pub key: String,
    pub fields: Vec<FieldValue>,
}

impl RawMessage {
    pub fn new(op: impl Into<String>, key: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        Self {
            op: op.into(),
            key: key.into(),
            fields,
        }
    }

    pub fn response(status: StatusCode, fields: Vec<FieldValue>) -> Self {
        Self::response_raw(status.as_str(), fields)
    }

    /// Response whose status key is passed through untouched.
    pub fn response_raw(status: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        Self::new(OP_GET_RESPONSE, status, fields)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Answer to the call currently waiting. `raw_status` is the key text as
    /// received, kept for the recording.
    GetResponse {
        status: StatusCode,
        raw_status: String,
        fields: Vec<FieldValue>,
    },
    /// Any other traffic sharing the consumer queue.
    Notification {
        op: String,
        key: String,
        fields: Vec<FieldValue>,
    },
}

impl InboundMessage {
    pub fn decode(raw: RawMessage) -> Self {
        if raw.op != OP_GET_RESPONSE {
            return Self::Notification {
                op: raw.op,
                key: raw.key,
                fields: raw.fields,
            };
        }
        let status = match raw.key.parse::<StatusCode>() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(key = %raw.key, error = %err, "undecodable response status");
                StatusCode::Failure
            }
        };
        Self::GetResponse {
            status,
            raw_status: raw.key,
            fields: raw.fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Timeout,
    Error,
}

pub trait Channel: Send + Sync {
    /// Unconditional write; delivery failures surface as a wait timeout.
    fn publish(&self, key: &str, fields: &[FieldValue], op: &str);
    /// Blocks until an inbound message is available or `timeout` elapses.
    fn wait_ready(&self, timeout: Duration) -> Readiness;
    fn pop_next(&self) -> Option<InboundMessage>;
}

// ── MemoryChannel ─────────────────────────────────────────────────────────────

/// In-process channel. The paired [`AgentEndpoint`] plays the remote side.
pub struct MemoryChannel {
    outbound: Sender<RawMessage>,
    inbound: Receiver<RawMessage>,
    staged: Mutex<VecDeque<RawMessage>>,
}

pub struct AgentEndpoint {
    requests: Receiver<RawMessage>,
    responses: Sender<RawMessage>,
}

impl MemoryChannel {
    pub fn pair() -> (Self, AgentEndpoint) {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        (
            Self {
                outbound: request_tx,
                inbound: response_rx,
                staged: Mutex::new(VecDeque::new()),
            },
            AgentEndpoint {
                requests: request_rx,
                responses: response_tx,
            },
        )
    }

    fn staged(&self) -> std::sync::MutexGuard<'_, VecDeque<RawMessage>> {
        self.staged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Channel for MemoryChannel {
    fn publish(&self, key: &str, fields: &[FieldValue], op: &str) {
        let message = RawMessage::new(op, key, fields.to_vec());
        if self.outbound.send(message).is_err() {
            tracing::warn!(key, op, "agent endpoint dropped; request not delivered");
        }
    }

    fn wait_ready(&self, timeout: Duration) -> Readiness {
        if !self.staged().is_empty() {
            return Readiness::Ready;
        }
        match self.inbound.recv_timeout(timeout) {
            Ok(message) => {
                self.staged().push_back(message);
                Readiness::Ready
            }
            Err(RecvTimeoutError::Timeout) => Readiness::Timeout,
            Err(RecvTimeoutError::Disconnected) => Readiness::Error,
        }
    }

    fn pop_next(&self) -> Option<InboundMessage> {
        if let Some(message) = self.staged().pop_front() {
            return Some(InboundMessage::decode(message));
        }
        match self.inbound.try_recv() {
            Ok(message) => Some(InboundMessage::decode(message)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl AgentEndpoint {
    pub fn recv_request(&self, timeout: Duration) -> Option<RawMessage> {
        self.requests.recv_timeout(timeout).ok()
    }

    pub fn drain_requests(&self) -> Vec<RawMessage> {
        self.requests.try_iter().collect()
    }

    pub fn respond(&self, status: StatusCode, fields: Vec<FieldValue>) -> bool {
        self.send(RawMessage::response(status, fields))
    }

    pub fn send(&self, message: RawMessage) -> bool {
        self.responses.send(message).is_ok()
    }
}

// ── FakeChannel ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedEvent {
    Message(RawMessage),
    Timeout,
    Error,
}

/// Scripted channel: each readiness wait consumes the next scripted event.
/// An exhausted script reports a timeout.
#[derive(Default, Clone)]
pub struct FakeChannel {
    script: Arc<Mutex<VecDeque<ScriptedEvent>>>,
    ready: Arc<Mutex<Option<RawMessage>>>,
    published: Arc<Mutex<Vec<RawMessage>>>,
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl FakeChannel {
    pub fn push_event(&self, event: ScriptedEvent) {
        self.script.lock().expect("script lock").push_back(event);
    }

    pub fn push_message(&self, message: RawMessage) {
        self.push_event(ScriptedEvent::Message(message));
    }

    pub fn push_response(&self, status: StatusCode, fields: Vec<FieldValue>) {
        self.push_message(RawMessage::response(status, fields));
    }

    pub fn published(&self) -> Vec<RawMessage> {
        self.published.lock().expect("published lock").clone()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().expect("waits lock").clone()
    }

    pub fn remaining_events(&self) -> usize {
        self.script.lock().expect("script lock").len()
    }
}

impl Channel for FakeChannel {
    fn publish(&self, key: &str, fields: &[FieldValue], op: &str) {
        self.published
            .lock()
            .expect("published lock")
            .push(RawMessage::new(op, key, fields.to_vec()));
    }

    fn wait_ready(&self, timeout: Duration) -> Readiness {
        self.waits.lock().expect("waits lock").push(timeout);
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            Some(ScriptedEvent::Message(message)) => {
                *self.ready.lock().expect("ready lock") = Some(message);
                Readiness::Ready
            }
            Some(ScriptedEvent::Error) => Readiness::Error,
            Some(ScriptedEvent::Timeout) | None => Readiness::Timeout,
        }
    }

    fn pop_next(&self) -> Option<InboundMessage> {
        self.ready
            .lock()
            .expect("ready lock")
            .take()
            .map(InboundMessage::decode)
    }
}
