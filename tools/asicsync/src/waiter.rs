//! Turns the shared inbound stream into a blocking call result.
//!
//! The consumer queue is unordered and carries unrelated notifications, so the
//! waiter drains it until a `getresponse` arrives rather than trusting the
//! next message. One deadline is taken per call; each readiness wait gets the
//! remaining budget, so a call never outlives the configured timeout.

use crate::channel::{Channel, InboundMessage, Readiness};
use crate::config::ClientConfig;
use crate::replay::recorder::Recorder;
use crate::types::{CommonApi, StatusCode};
use std::time::{Duration, Instant};

/// Status returned when no response arrives.
pub const GENERIC_FAILURE: StatusCode = StatusCode::Failure;

#[derive(Clone)]
pub struct ResponseWaiter {
    sync_mode: bool,
    timeout: Duration,
    recorder: Recorder,
}

impl ResponseWaiter {
    pub fn new(config: &ClientConfig, recorder: Recorder) -> Self {
        Self {
            sync_mode: config.sync_mode,
            timeout: config.response_timeout(),
            recorder,
        }
    }

    pub fn wait(&self, channel: &dyn Channel, api: CommonApi) -> StatusCode {
        if !self.sync_mode {
            // Fire-and-forget.
            return StatusCode::Success;
        }

        tracing::info!(api = api.as_str(), "waiting for response");
        let deadline = Instant::now() + self.timeout;

        let failure = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Readiness::Timeout;
            }
            match channel.wait_ready(remaining) {
                Readiness::Ready => {}
                other => break other,
            }
            match channel.pop_next() {
                Some(InboundMessage::GetResponse {
                    status,
                    raw_status,
                    fields,
                }) => {
                    self.recorder.record_response(&raw_status, &fields);
                    tracing::debug!(api = api.as_str(), %status, "response received");
                    return status;
                }
                Some(InboundMessage::Notification { op, key, .. }) => {
                    tracing::debug!(%op, %key, "ignoring non-response message");
                }
                None => {}
            }
        };

        tracing::error!(
            api = api.as_str(),
            result = ?failure,
            "failed to get response"
        );
        self.recorder.record_failure(GENERIC_FAILURE);
        GENERIC_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{FakeChannel, RawMessage, ScriptedEvent};
    use crate::replay::recorder::MemoryRecordSink;
    use std::sync::Arc;

    fn sync_config() -> ClientConfig {
        ClientConfig {
            sync_mode: true,
            response_timeout_ms: 1_000,
            ..ClientConfig::default()
        }
    }

    fn recording_waiter(config: &ClientConfig) -> (ResponseWaiter, MemoryRecordSink) {
        let sink = MemoryRecordSink::default();
        let waiter = ResponseWaiter::new(config, Recorder::with_sink(Arc::new(sink.clone())));
        (waiter, sink)
    }

    #[test]
    fn async_mode_returns_success_without_touching_channel() {
        let channel = FakeChannel::default();
        let (waiter, sink) = recording_waiter(&ClientConfig::default());
        assert_eq!(waiter.wait(&channel, CommonApi::Set), StatusCode::Success);
        assert!(channel.waits().is_empty());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn skips_unrelated_traffic_until_response() {
        let channel = FakeChannel::default();
        channel.push_message(RawMessage::new("port_state_change", "[]", Vec::new()));
        channel.push_message(RawMessage::new("switch_shutdown_request", "", Vec::new()));
        channel.push_response(
            StatusCode::InvalidParameter,
            vec![("attr".to_string(), "x".to_string())],
        );
        let (waiter, sink) = recording_waiter(&sync_config());

        assert_eq!(
            waiter.wait(&channel, CommonApi::Set),
            StatusCode::InvalidParameter
        );
        assert_eq!(channel.waits().len(), 3);
        assert_eq!(sink.lines(), vec!["G|INVALID_PARAMETER|attr=x".to_string()]);
    }

    #[test]
    fn timeout_records_generic_failure() {
        let channel = FakeChannel::default();
        channel.push_event(ScriptedEvent::Timeout);
        channel.push_response(StatusCode::Success, Vec::new());
        let (waiter, sink) = recording_waiter(&sync_config());

        assert_eq!(waiter.wait(&channel, CommonApi::Create), StatusCode::Failure);
        assert_eq!(channel.remaining_events(), 1, "no retry after a timeout");
        assert_eq!(sink.lines(), vec!["G|FAILURE".to_string()]);
    }

    #[test]
    fn readiness_error_is_treated_like_timeout() {
        let channel = FakeChannel::default();
        channel.push_event(ScriptedEvent::Error);
        let (waiter, sink) = recording_waiter(&sync_config());
        assert_eq!(waiter.wait(&channel, CommonApi::Set), StatusCode::Failure);
        assert_eq!(sink.lines(), vec!["G|FAILURE".to_string()]);
    }

    #[test]
    fn each_readiness_wait_is_bounded_by_the_timeout() {
        let channel = FakeChannel::default();
        channel.push_message(RawMessage::new("notify", "k", Vec::new()));
        let waiter = ResponseWaiter::new(&sync_config(), Recorder::disabled());
        assert_eq!(waiter.wait(&channel, CommonApi::Set), StatusCode::Failure);
        let waits = channel.waits();
        assert_eq!(waits.len(), 2);
        assert!(waits.iter().all(|w| *w <= Duration::from_millis(1_000)));
    }
}
