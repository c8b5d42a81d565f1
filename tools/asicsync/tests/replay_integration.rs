use asicsync::channel::{FakeChannel, ScriptedEvent};
use asicsync::client::SyncClient;
use asicsync::config::{ClientConfig, RecordingConfig};
use asicsync::encoder::{AttrValue, Attribute, ListAttributeEncoder};
use asicsync::replay::recording::{RecordLine, SessionRecording};
use asicsync::replay::replayer::{reissue_recording, ReplayChannel};
use asicsync::types::{ObjectType, StatusCode};
use std::path::Path;
use std::sync::Arc;

fn record_session(path: &Path, channel: &FakeChannel, sync_mode: bool) -> Vec<StatusCode> {
    let cfg = ClientConfig {
        sync_mode,
        response_timeout_ms: 1_000,
        recording: RecordingConfig {
            enabled: true,
            path: path.to_path_buf(),
        },
    };
    let client = SyncClient::from_config(&cfg, Arc::new(channel.clone()), Arc::new(ListAttributeEncoder))
        .expect("client with file recorder");
    assert!(client.recorder().is_enabled());

    let mtu = Attribute::new("SAI_PORT_ATTR_MTU", AttrValue::U32(9100));
    let action = |v: &str| {
        Attribute::new(
            "SAI_ROUTE_ENTRY_ATTR_PACKET_ACTION",
            AttrValue::Str(v.to_string()),
        )
    };

    vec![
        client.set(ObjectType::Port, "oid:0x1000000000002", &mtu),
        client.bulk_set(
            ObjectType::RouteEntry,
            &["r1".to_string(), "r2".to_string()],
            &[action("FORWARD"), action("DROP")],
            &[StatusCode::Success, StatusCode::ItemNotFound],
        ),
        client.set(ObjectType::Port, "oid:0x1000000000003", &mtu),
    ]
}

fn scripted_channel() -> FakeChannel {
    let channel = FakeChannel::default();
    channel.push_response(
        StatusCode::Success,
        vec![("SAI_PORT_ATTR_MTU".to_string(), "9100".to_string())],
    );
    channel.push_response(StatusCode::Success, Vec::new());
    channel.push_event(ScriptedEvent::Timeout);
    channel
}

#[test]
fn recorded_session_loads_in_call_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sairedis.rec");
    let statuses = record_session(&path, &scripted_channel(), true);
    assert_eq!(
        statuses,
        vec![StatusCode::Success, StatusCode::Success, StatusCode::Failure]
    );

    let recording = SessionRecording::load(&path).expect("load recording");
    assert_eq!(
        recording.raw_lines(),
        &[
            "s|PORT:oid:0x1000000000002|SAI_PORT_ATTR_MTU=9100".to_string(),
            "G|SUCCESS|SAI_PORT_ATTR_MTU=9100".to_string(),
            "S|ROUTE_ENTRY||r1|SAI_ROUTE_ENTRY_ATTR_PACKET_ACTION=FORWARD|SUCCESS||r2|SAI_ROUTE_ENTRY_ATTR_PACKET_ACTION=DROP|ITEM_NOT_FOUND".to_string(),
            "G|SUCCESS|".to_string(),
            "s|PORT:oid:0x1000000000003|SAI_PORT_ATTR_MTU=9100".to_string(),
            "G|FAILURE".to_string(),
        ]
    );
    assert!(matches!(recording.lines()[5], RecordLine::NoResponse { .. }));
}

#[test]
fn reissued_session_reproduces_recording_byte_for_byte() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sairedis.rec");
    let original = record_session(&path, &scripted_channel(), true);

    let recording = SessionRecording::load(&path).expect("load recording");
    let report = reissue_recording(&recording).expect("reissue");

    assert!(report.mismatches.is_empty(), "{:?}", report.mismatches);
    assert!(report.identical);
    assert_eq!(report.statuses, original);
}

#[test]
fn fire_and_forget_session_reissues_without_waits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("async.rec");
    let statuses = record_session(&path, &FakeChannel::default(), false);
    assert!(statuses.iter().all(|s| s.is_success()));

    let recording = SessionRecording::load(&path).expect("load");
    assert_eq!(recording.outcomes().count(), 0);
    let report = reissue_recording(&recording).expect("reissue");
    assert!(report.identical);
}

#[test]
fn identical_sessions_produce_identical_fingerprints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.rec");
    let second = dir.path().join("second.rec");
    record_session(&first, &scripted_channel(), true);
    record_session(&second, &scripted_channel(), true);

    let a = std::fs::read(&first).expect("first");
    let b = std::fs::read(&second).expect("second");
    assert_eq!(a, b);
    assert_eq!(
        SessionRecording::load(&first).expect("a").fingerprint(),
        SessionRecording::load(&second).expect("b").fingerprint()
    );
}

#[test]
fn replay_channel_tracks_published_requests() {
    let recording = SessionRecording::parse(
        "s|PORT:oid:0x1|SAI_PORT_ATTR_MTU=1500\nG|SUCCESS|\nS|FDB_ENTRY||a|x=1|SUCCESS||b|x=2|SUCCESS\nG|SUCCESS|\n",
    )
    .expect("parse");
    let channel = Arc::new(ReplayChannel::from_recording(&recording).expect("channel"));
    let client = SyncClient::new(
        &ClientConfig {
            sync_mode: true,
            ..ClientConfig::default()
        },
        channel.clone(),
        Arc::new(ListAttributeEncoder),
        asicsync::replay::recorder::Recorder::disabled(),
    );

    assert_eq!(
        client.set(
            ObjectType::Port,
            "oid:0x1",
            &Attribute::new("SAI_PORT_ATTR_MTU", AttrValue::U32(1500))
        ),
        StatusCode::Success
    );
    let mismatches = channel.verify_request_alignment();
    assert_eq!(mismatches.len(), 1, "bulk request not yet replayed");
    assert_eq!(mismatches[0].position, 1);
    assert_eq!(
        mismatches[0].expected.as_ref().map(|m| m.key.as_str()),
        Some("FDB_ENTRY:2")
    );
    assert_eq!(channel.actual_requests().len(), 1);
    assert_eq!(channel.remaining_outcomes(), 1);
}
