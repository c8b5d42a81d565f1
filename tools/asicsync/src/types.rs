use crate::errors::SyncError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One encoded `(attribute name, attribute value)` pair.
pub type FieldValue = (String, String);

const STATUS_PREFIX: &str = "SAI_STATUS_";
const OBJECT_TYPE_PREFIX: &str = "SAI_OBJECT_TYPE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    Failure,
    NotSupported,
    NoMemory,
    InsufficientResources,
    InvalidParameter,
    ItemAlreadyExists,
    ItemNotFound,
    ObjectInUse,
    NotImplemented,
    Uninitialized,
}

impl StatusCode {
    pub const ALL: [StatusCode; 11] = [
        Self::Success,
        Self::Failure,
        Self::NotSupported,
        Self::NoMemory,
        Self::InsufficientResources,
        Self::InvalidParameter,
        Self::ItemAlreadyExists,
        Self::ItemNotFound,
        Self::ObjectInUse,
        Self::NotImplemented,
        Self::Uninitialized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::NoMemory => "NO_MEMORY",
            Self::InsufficientResources => "INSUFFICIENT_RESOURCES",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::ItemAlreadyExists => "ITEM_ALREADY_EXISTS",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::ObjectInUse => "OBJECT_IN_USE",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Uninitialized => "UNINITIALIZED",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both `SUCCESS` and the long `SAI_STATUS_SUCCESS` spelling.
impl FromStr for StatusCode {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bare = value.strip_prefix(STATUS_PREFIX).unwrap_or(value);
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == bare)
            .ok_or_else(|| SyncError::Decode(format!("unknown status `{value}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Switch,
    Port,
    Vlan,
    VirtualRouter,
    RouterInterface,
    NextHop,
    NextHopGroup,
    Lag,
    AclTable,
    FdbEntry,
    NeighborEntry,
    RouteEntry,
    InsegEntry,
    IpmcEntry,
    L2mcEntry,
    McastFdbEntry,
}

impl ObjectType {
    pub const ALL: [ObjectType; 16] = [
        Self::Switch,
        Self::Port,
        Self::Vlan,
        Self::VirtualRouter,
        Self::RouterInterface,
        Self::NextHop,
        Self::NextHopGroup,
        Self::Lag,
        Self::AclTable,
        Self::FdbEntry,
        Self::NeighborEntry,
        Self::RouteEntry,
        Self::InsegEntry,
        Self::IpmcEntry,
        Self::L2mcEntry,
        Self::McastFdbEntry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "SWITCH",
            Self::Port => "PORT",
            Self::Vlan => "VLAN",
            Self::VirtualRouter => "VIRTUAL_ROUTER",
            Self::RouterInterface => "ROUTER_INTERFACE",
            Self::NextHop => "NEXT_HOP",
            Self::NextHopGroup => "NEXT_HOP_GROUP",
            Self::Lag => "LAG",
            Self::AclTable => "ACL_TABLE",
            Self::FdbEntry => "FDB_ENTRY",
            Self::NeighborEntry => "NEIGHBOR_ENTRY",
            Self::RouteEntry => "ROUTE_ENTRY",
            Self::InsegEntry => "INSEG_ENTRY",
            Self::IpmcEntry => "IPMC_ENTRY",
            Self::L2mcEntry => "L2MC_ENTRY",
            Self::McastFdbEntry => "MCAST_FDB_ENTRY",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bare = value.strip_prefix(OBJECT_TYPE_PREFIX).unwrap_or(value);
        Self::ALL
            .iter()
            .copied()
            .find(|object_type| object_type.as_str() == bare)
            .ok_or_else(|| SyncError::Decode(format!("unknown object type `{value}`")))
    }
}

/// The api a wait belongs to. Only used for diagnostics; correlation is by
/// response kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonApi {
    Create,
    Set,
}

impl CommonApi {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Set => "set",
        }
    }
}

/// Opaque 64-bit object handle, rendered as `oid:0x<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oid:0x{:x}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value
            .strip_prefix("oid:0x")
            .ok_or_else(|| SyncError::Decode(format!("object id `{value}` lacks oid:0x prefix")))?;
        u64::from_str_radix(hex, 16)
            .map(ObjectId)
            .map_err(|e| SyncError::Decode(format!("object id `{value}`: {e}")))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Renders fields as `name=value|name=value`, keeping their order.
pub fn join_field_values(fields: &[FieldValue]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Inverse of [`join_field_values`]. Each segment splits on its first `=`.
pub fn split_field_values(joined: &str) -> Result<Vec<FieldValue>, SyncError> {
    if joined.is_empty() {
        return Ok(Vec::new());
    }
    joined
        .split('|')
        .map(|segment| {
            segment
                .split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| SyncError::Decode(format!("field `{segment}` has no `=`")))
        })
        .collect()
}
