//! Typed non-oid entries and their canonical key form.
//!
//! Entries that are not addressed by an [`ObjectId`] are keyed by a JSON
//! object whose field order is fixed by the struct declaration order, so the
//! same entry always produces the same key text.

use crate::encoder::render_mac;
use crate::types::{ObjectId, ObjectType};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;

/// Key-serialization strategy shared by every typed entry.
pub trait EntryKey {
    const OBJECT_TYPE: ObjectType;

    fn serialize_key(&self) -> String;
}

// Entry fields are all scalars rendered as strings.
fn json_key<T: Serialize>(entry: &T) -> String {
    serde_json::to_string(entry).expect("entry key serializes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_mac(&self.0))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl Serialize for IpPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IpmcEntryType {
    #[serde(rename = "SAI_IPMC_ENTRY_TYPE_XG")]
    Xg,
    #[serde(rename = "SAI_IPMC_ENTRY_TYPE_SG")]
    Sg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum L2mcEntryType {
    #[serde(rename = "SAI_L2MC_ENTRY_TYPE_XG")]
    Xg,
    #[serde(rename = "SAI_L2MC_ENTRY_TYPE_SG")]
    Sg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub dest: IpPrefix,
    pub switch_id: ObjectId,
    pub vr: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborEntry {
    pub ip: IpAddr,
    pub rif: ObjectId,
    pub switch_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FdbEntry {
    pub bvid: ObjectId,
    pub mac: MacAddress,
    pub switch_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsegEntry {
    #[serde(serialize_with = "as_text")]
    pub label: u32,
    pub switch_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpmcEntry {
    pub destination: IpAddr,
    pub source: IpAddr,
    pub switch_id: ObjectId,
    #[serde(rename = "type")]
    pub entry_type: IpmcEntryType,
    pub vr_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct L2mcEntry {
    pub bv_id: ObjectId,
    pub destination: IpAddr,
    pub source: IpAddr,
    pub switch_id: ObjectId,
    #[serde(rename = "type")]
    pub entry_type: L2mcEntryType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McastFdbEntry {
    pub bv_id: ObjectId,
    pub mac_address: MacAddress,
    pub switch_id: ObjectId,
}

fn as_text<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl EntryKey for RouteEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::RouteEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for NeighborEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::NeighborEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for FdbEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::FdbEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for InsegEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::InsegEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for IpmcEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::IpmcEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for L2mcEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::L2mcEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}

impl EntryKey for McastFdbEntry {
    const OBJECT_TYPE: ObjectType = ObjectType::McastFdbEntry;

    fn serialize_key(&self) -> String {
        json_key(self)
    }
}
