//! Set-request builders: encode, record, publish, then wait exactly once.
//!
//! Correlation is by response kind only. Calls issued concurrently on one
//! channel must be serialized by the caller, otherwise a response can be
//! consumed by the wrong waiter.

use crate::channel::{Channel, OP_BULK_SET, OP_SET};
use crate::config::ClientConfig;
use crate::encoder::{Attribute, AttributeEncoder};
use crate::entries::{
    EntryKey, FdbEntry, InsegEntry, IpmcEntry, L2mcEntry, McastFdbEntry, NeighborEntry,
    RouteEntry,
};
use crate::errors::SyncError;
use crate::replay::recorder::Recorder;
use crate::types::{join_field_values, CommonApi, FieldValue, ObjectId, ObjectType, StatusCode};
use crate::waiter::ResponseWaiter;
use std::sync::Arc;

/// Per-item outcome of the caller's precheck, with the item already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub object_id: String,
    pub encoded_attributes: String,
    pub precheck_status: StatusCode,
}

pub struct SyncClient {
    channel: Arc<dyn Channel>,
    encoder: Arc<dyn AttributeEncoder>,
    recorder: Recorder,
    waiter: ResponseWaiter,
}

impl SyncClient {
    pub fn new(
        config: &ClientConfig,
        channel: Arc<dyn Channel>,
        encoder: Arc<dyn AttributeEncoder>,
        recorder: Recorder,
    ) -> Self {
        Self {
            waiter: ResponseWaiter::new(config, recorder.clone()),
            channel,
            encoder,
            recorder,
        }
    }

    /// Builds the recorder from `config.recording`.
    pub fn from_config(
        config: &ClientConfig,
        channel: Arc<dyn Channel>,
        encoder: Arc<dyn AttributeEncoder>,
    ) -> Result<Self, SyncError> {
        let recorder = Recorder::from_config(&config.recording)?;
        Ok(Self::new(config, channel, encoder, recorder))
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // ── single set ────────────────────────────────────────────────────────────

    pub fn set(
        &self,
        object_type: ObjectType,
        serialized_object_id: &str,
        attribute: &Attribute,
    ) -> StatusCode {
        let fields = self
            .encoder
            .encode(object_type, std::slice::from_ref(attribute), false);
        let key = format!("{object_type}:{serialized_object_id}");
        self.submit_set(&key, &fields)
    }

    /// Publishes an already-encoded single set and waits for its response.
    pub fn submit_set(&self, key: &str, fields: &[FieldValue]) -> StatusCode {
        tracing::debug!(key, fields = fields.len(), "generic set");
        self.recorder.record_set(key, fields);
        self.channel.publish(key, fields, OP_SET);
        self.waiter.wait(self.channel.as_ref(), CommonApi::Set)
    }

    pub fn set_object(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        attribute: &Attribute,
    ) -> StatusCode {
        self.set(object_type, &object_id.to_string(), attribute)
    }

    pub fn set_entry<K: EntryKey>(&self, entry: &K, attribute: &Attribute) -> StatusCode {
        self.set(K::OBJECT_TYPE, &entry.serialize_key(), attribute)
    }

    pub fn set_route_entry(&self, entry: &RouteEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_neighbor_entry(&self, entry: &NeighborEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_fdb_entry(&self, entry: &FdbEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_inseg_entry(&self, entry: &InsegEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_ipmc_entry(&self, entry: &IpmcEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_l2mc_entry(&self, entry: &L2mcEntry, attribute: &Attribute) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    pub fn set_mcast_fdb_entry(
        &self,
        entry: &McastFdbEntry,
        attribute: &Attribute,
    ) -> StatusCode {
        self.set_entry(entry, attribute)
    }

    // ── bulk set ──────────────────────────────────────────────────────────────

    /// `object_ids`, `attributes` and `precheck_statuses` are index aligned.
    /// Mismatched lengths fail the call before anything is recorded or sent.
    pub fn bulk_set(
        &self,
        object_type: ObjectType,
        object_ids: &[String],
        attributes: &[Attribute],
        precheck_statuses: &[StatusCode],
    ) -> StatusCode {
        if object_ids.len() != attributes.len() || object_ids.len() != precheck_statuses.len() {
            tracing::error!(
                ids = object_ids.len(),
                attributes = attributes.len(),
                statuses = precheck_statuses.len(),
                "bulk set inputs are not index aligned"
            );
            return StatusCode::InvalidParameter;
        }

        let items = object_ids
            .iter()
            .zip(attributes)
            .zip(precheck_statuses)
            .map(|((object_id, attribute), status)| {
                let fields =
                    self.encoder
                        .encode(object_type, std::slice::from_ref(attribute), false);
                ItemOutcome {
                    object_id: object_id.clone(),
                    encoded_attributes: join_field_values(&fields),
                    precheck_status: *status,
                }
            })
            .collect::<Vec<_>>();

        self.submit_bulk_set(object_type, &items)
    }

    /// Records every item, publishes only the ones that passed precheck, and
    /// waits once for the whole batch.
    pub fn submit_bulk_set(&self, object_type: ObjectType, items: &[ItemOutcome]) -> StatusCode {
        self.recorder
            .record_bulk_set(object_type.as_str(), || audit_items(items));
        let payload = payload_items(items);

        let key = format!("{object_type}:{}", payload.len());
        if payload.is_empty() {
            tracing::debug!(key = %key, "bulk set has no items to publish");
        } else {
            self.channel.publish(&key, &payload, OP_BULK_SET);
        }

        self.waiter.wait(self.channel.as_ref(), CommonApi::Create)
    }
}

/// Every item with its precheck status appended, in input order.
pub fn audit_items(items: &[ItemOutcome]) -> Vec<FieldValue> {
    items
        .iter()
        .map(|item| {
            (
                item.object_id.clone(),
                format!("{}|{}", item.encoded_attributes, item.precheck_status),
            )
        })
        .collect()
}

/// Items that passed precheck, in input order.
pub fn payload_items(items: &[ItemOutcome]) -> Vec<FieldValue> {
    let mut payload = Vec::with_capacity(items.len());
    for item in items {
        if !item.precheck_status.is_success() {
            tracing::warn!(
                object_id = %item.object_id,
                status = %item.precheck_status,
                "skipping bulk item that failed precheck"
            );
            continue;
        }
        payload.push((item.object_id.clone(), item.encoded_attributes.clone()));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::FakeChannel;
    use crate::encoder::{AttrValue, ListAttributeEncoder};
    use crate::replay::recorder::MemoryRecordSink;

    fn item(id: &str, attrs: &str, status: StatusCode) -> ItemOutcome {
        ItemOutcome {
            object_id: id.to_string(),
            encoded_attributes: attrs.to_string(),
            precheck_status: status,
        }
    }

    fn client(sync_mode: bool) -> (SyncClient, FakeChannel, MemoryRecordSink) {
        let channel = FakeChannel::default();
        let sink = MemoryRecordSink::default();
        let config = ClientConfig {
            sync_mode,
            response_timeout_ms: 500,
            ..ClientConfig::default()
        };
        let client = SyncClient::new(
            &config,
            Arc::new(channel.clone()),
            Arc::new(ListAttributeEncoder),
            Recorder::with_sink(Arc::new(sink.clone())),
        );
        (client, channel, sink)
    }

    #[test]
    fn audit_keeps_every_item_and_payload_drops_failed_ones() {
        let items = vec![
            item("a", "x=1", StatusCode::Success),
            item("b", "x=2", StatusCode::InvalidParameter),
            item("c", "x=3", StatusCode::Success),
        ];
        assert_eq!(
            audit_items(&items),
            vec![
                ("a".to_string(), "x=1|SUCCESS".to_string()),
                ("b".to_string(), "x=2|INVALID_PARAMETER".to_string()),
                ("c".to_string(), "x=3|SUCCESS".to_string()),
            ]
        );
        assert_eq!(
            payload_items(&items),
            vec![
                ("a".to_string(), "x=1".to_string()),
                ("c".to_string(), "x=3".to_string()),
            ]
        );
    }

    #[test]
    fn mismatched_bulk_inputs_are_rejected_without_side_effects() {
        let (client, channel, sink) = client(true);
        let status = client.bulk_set(
            ObjectType::FdbEntry,
            &["a".to_string()],
            &[],
            &[StatusCode::Success],
        );
        assert_eq!(status, StatusCode::InvalidParameter);
        assert!(channel.published().is_empty());
        assert!(channel.waits().is_empty());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn set_object_keys_by_oid() {
        let (client, channel, sink) = client(false);
        let attr = Attribute::new("SAI_PORT_ATTR_ADMIN_STATE", AttrValue::Bool(true));
        assert_eq!(
            client.set_object(ObjectType::Port, ObjectId(0x1000000000002), &attr),
            StatusCode::Success
        );
        assert_eq!(channel.published()[0].key, "PORT:oid:0x1000000000002");
        assert_eq!(
            sink.lines(),
            vec!["s|PORT:oid:0x1000000000002|SAI_PORT_ATTR_ADMIN_STATE=true".to_string()]
        );
    }
}
