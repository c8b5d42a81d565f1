//! Attribute encoding: typed attributes in, ordered `(name, value)` pairs out.

use crate::types::{FieldValue, ObjectId, ObjectType};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I32(i32),
    Str(String),
    Mac([u8; 6]),
    Ip(IpAddr),
    IpPrefix { addr: IpAddr, prefix_len: u8 },
    Oid(ObjectId),
    OidList(Vec<ObjectId>),
    U32List(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: String,
    pub value: AttrValue,
}

impl Attribute {
    pub fn new(id: impl Into<String>, value: AttrValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Turns attributes into an ordered field sequence. Implementations must be
/// deterministic and side-effect free.
pub trait AttributeEncoder: Send + Sync {
    fn encode(
        &self,
        object_type: ObjectType,
        attributes: &[Attribute],
        count_only: bool,
    ) -> Vec<FieldValue>;
}

/// Emits one pair per attribute, in input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAttributeEncoder;

impl AttributeEncoder for ListAttributeEncoder {
    fn encode(
        &self,
        _object_type: ObjectType,
        attributes: &[Attribute],
        count_only: bool,
    ) -> Vec<FieldValue> {
        attributes
            .iter()
            .map(|attr| (attr.id.clone(), render_value(&attr.value, count_only)))
            .collect()
    }
}

pub fn render_value(value: &AttrValue, count_only: bool) -> String {
    match value {
        AttrValue::Bool(v) => v.to_string(),
        AttrValue::U8(v) => v.to_string(),
        AttrValue::U16(v) => v.to_string(),
        AttrValue::U32(v) => v.to_string(),
        AttrValue::U64(v) => v.to_string(),
        AttrValue::I32(v) => v.to_string(),
        AttrValue::Str(v) => v.clone(),
        AttrValue::Mac(bytes) => render_mac(bytes),
        AttrValue::Ip(addr) => addr.to_string(),
        AttrValue::IpPrefix { addr, prefix_len } => format!("{addr}/{prefix_len}"),
        AttrValue::Oid(oid) => oid.to_string(),
        AttrValue::OidList(list) => render_list(list.len(), count_only, || {
            list.iter().map(ToString::to_string).collect()
        }),
        AttrValue::U32List(list) => render_list(list.len(), count_only, || {
            list.iter().map(ToString::to_string).collect()
        }),
    }
}

pub fn render_mac(bytes: &[u8; 6]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

// `<len>:a,b,c`, or `<len>:null` when only the count is wanted
fn render_list(len: usize, count_only: bool, items: impl FnOnce() -> Vec<String>) -> String {
    if count_only {
        return format!("{len}:null");
    }
    format!("{len}:{}", items().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn encodes_attributes_in_input_order() {
        let attrs = vec![
            Attribute::new("nexthop", AttrValue::Str("eth0".to_string())),
            Attribute::new("SAI_ROUTE_ENTRY_ATTR_META_DATA", AttrValue::U32(7)),
        ];
        let fields = ListAttributeEncoder.encode(ObjectType::RouteEntry, &attrs, false);
        assert_eq!(
            fields,
            vec![
                ("nexthop".to_string(), "eth0".to_string()),
                ("SAI_ROUTE_ENTRY_ATTR_META_DATA".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn renders_mac_prefix_and_lists() {
        assert_eq!(
            render_value(&AttrValue::Mac([0x00, 0x11, 0xaa, 0xbb, 0x0c, 0xff]), false),
            "00:11:AA:BB:0C:FF"
        );
        assert_eq!(
            render_value(
                &AttrValue::IpPrefix {
                    addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)),
                    prefix_len: 24,
                },
                false
            ),
            "10.0.0.0/24"
        );
        let list = AttrValue::OidList(vec![ObjectId(0x1), ObjectId(0x2a)]);
        assert_eq!(render_value(&list, false), "2:oid:0x1,oid:0x2a");
        assert_eq!(render_value(&list, true), "2:null");
        assert_eq!(render_value(&AttrValue::U32List(Vec::new()), false), "0:");
    }

    #[test]
    fn encoding_is_deterministic() {
        let attrs = vec![Attribute::new("a", AttrValue::Bool(true))];
        let first = ListAttributeEncoder.encode(ObjectType::Port, &attrs, false);
        let second = ListAttributeEncoder.encode(ObjectType::Port, &attrs, false);
        assert_eq!(first, second);
    }
}
