// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types of the address space.
//!
//! This module defines the identifier, value and attribute types shared by
//! every component of the server:
//!
//! - [`NodeId`]: namespace-qualified node identifier
//! - [`DataType`] / [`Value`]: the scalar kinds a variable can hold
//! - [`StatusCode`]: OPC UA style 32-bit status codes
//! - [`DataValue`]: a (value, timestamp, status) triple
//! - [`AccessLevel`], [`WriteMask`], [`ReferenceKind`], [`NodeKind`]

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// NodeId
// =============================================================================

/// Node identifier.
///
/// A NodeId uniquely identifies a node within the address space. It consists
/// of a namespace index and an identifier which can be numeric, string or GUID.
///
/// # Examples
///
/// ```
/// use ctrl_core::types::NodeId;
///
/// let numeric = NodeId::numeric(0, 85);
/// let string = NodeId::string(2, "Controls_Mode");
///
/// let parsed: NodeId = "ns=2;s=Controls_Mode".parse().unwrap();
/// assert_eq!(parsed, string);
/// assert_eq!(numeric.to_string(), "i=85");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Root folder node (ns=0, i=84).
    pub const ROOT_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(84),
    };

    /// Objects folder node (ns=0, i=85).
    pub const OBJECTS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(85),
    };

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if this is in the standard namespace (ns=0).
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Converts to the textual format `ns=<namespace>;{i|s|g}=<identifier>`.
    ///
    /// The namespace prefix is omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

/// Error returned when a textual node id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid node id '{input}': {reason}")]
pub struct NodeIdParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl NodeIdParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl FromStr for NodeId {
    type Err = NodeIdParseError;

    /// Parses `ns=2;s=Name`, `ns=0;i=85`, `i=85`, `s=Name` or `g=<uuid>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| NodeIdParseError::new(s, "missing identifier after namespace"))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| NodeIdParseError::new(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            NodeIdentifier::Numeric(
                id.parse()
                    .map_err(|_| NodeIdParseError::new(s, "invalid numeric identifier"))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            if id.is_empty() {
                return Err(NodeIdParseError::new(s, "empty string identifier"));
            }
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            NodeIdentifier::Guid(
                Uuid::parse_str(id).map_err(|_| NodeIdParseError::new(s, "invalid GUID"))?,
            )
        } else {
            return Err(NodeIdParseError::new(
                s,
                "unknown identifier type, expected i=, s= or g=",
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

/// Node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier (used for standard nodes).
    Numeric(u32),
    /// String identifier (used for application nodes).
    String(String),
    /// GUID identifier.
    Guid(Uuid),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
        }
    }
}

// =============================================================================
// DataType / Value
// =============================================================================

/// Scalar data types a variable node can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Boolean value.
    Boolean,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// UTF-8 string.
    String,
}

impl DataType {
    /// Returns the data type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
        }
    }

    /// Returns the standard data type node id number (ns=0).
    pub const fn type_id(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::Int16 => 4,
            Self::Int32 => 6,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
        }
    }

    /// Returns `true` for numeric types.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Float | Self::Double)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
}

impl Value {
    /// Returns the data type of this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctrl_core::types::{DataType, Value};
    ///
    /// assert_eq!(Value::Int16(2).data_type(), DataType::Int16);
    /// assert_eq!(Value::from(1.5f32).data_type(), DataType::Float);
    /// ```
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::String(_) => DataType::String,
        }
    }

    /// Returns the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        self.data_type().name()
    }

    /// Returns the value as `f64` if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int16(v) => Some(f64::from(*v)),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Boolean(_) | Self::String(_) => None,
        }
    }

    /// Builds a floating point value of the given type.
    ///
    /// Returns `None` for non floating point types.
    pub fn from_f64_as(data_type: DataType, value: f64) -> Option<Self> {
        match data_type {
            DataType::Float => Some(Self::Float(value as f32)),
            DataType::Double => Some(Self::Double(value)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Boolean,
    i16 => Int16,
    i32 => Int32,
    f32 => Float,
    f64 => Double,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// A 32-bit status code.
///
/// The two most significant bits carry the severity: `00` good, `01`
/// uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    /// Uncertain.
    pub const UNCERTAIN: StatusCode = StatusCode(0x4000_0000);
    /// Uncertain, last usable value.
    pub const UNCERTAIN_LAST_USABLE_VALUE: StatusCode = StatusCode(0x4090_0000);
    /// Bad.
    pub const BAD: StatusCode = StatusCode(0x8000_0000);
    /// An internal error occurred.
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    /// The server is shutting down.
    pub const BAD_SHUTDOWN: StatusCode = StatusCode(0x800C_0000);
    /// The certificate is not valid.
    pub const BAD_CERTIFICATE_INVALID: StatusCode = StatusCode(0x8012_0000);
    /// The certificate has expired or is not yet valid.
    pub const BAD_CERTIFICATE_TIME_INVALID: StatusCode = StatusCode(0x8014_0000);
    /// The certificate is not trusted.
    pub const BAD_CERTIFICATE_UNTRUSTED: StatusCode = StatusCode(0x801A_0000);
    /// The certificate has been revoked.
    pub const BAD_CERTIFICATE_REVOKED: StatusCode = StatusCode(0x801D_0000);
    /// User does not have permission to perform the requested operation.
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);
    /// The syntax of the node id is not valid.
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    /// The node id refers to a node that does not exist.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// The access level does not allow writing to the node.
    pub const BAD_NOT_WRITABLE: StatusCode = StatusCode(0x803B_0000);
    /// The requested node id is already used by another node.
    pub const BAD_NODE_ID_EXISTS: StatusCode = StatusCode(0x805E_0000);
    /// The value supplied for the attribute is not of the same type.
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    /// The client did not specify all of the input arguments for the method.
    pub const BAD_ARGUMENTS_MISSING: StatusCode = StatusCode(0x8076_0000);
    /// The certificate chain is incomplete.
    pub const BAD_CERTIFICATE_CHAIN_INCOMPLETE: StatusCode = StatusCode(0x810D_0000);
    /// One or more arguments are invalid.
    pub const BAD_INVALID_ARGUMENT: StatusCode = StatusCode(0x80AB_0000);

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name of this status code.
    pub const fn name(&self) -> &'static str {
        match self.0 {
            0x0000_0000 => "Good",
            0x4000_0000 => "Uncertain",
            0x4090_0000 => "UncertainLastUsableValue",
            0x8000_0000 => "Bad",
            0x8002_0000 => "BadInternalError",
            0x800C_0000 => "BadShutdown",
            0x8012_0000 => "BadCertificateInvalid",
            0x8014_0000 => "BadCertificateTimeInvalid",
            0x801A_0000 => "BadCertificateUntrusted",
            0x801D_0000 => "BadCertificateRevoked",
            0x801F_0000 => "BadUserAccessDenied",
            0x8033_0000 => "BadNodeIdInvalid",
            0x8034_0000 => "BadNodeIdUnknown",
            0x803B_0000 => "BadNotWritable",
            0x805E_0000 => "BadNodeIdExists",
            0x8074_0000 => "BadTypeMismatch",
            0x8076_0000 => "BadArgumentsMissing",
            0x80AB_0000 => "BadInvalidArgument",
            0x810D_0000 => "BadCertificateChainIncomplete",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value together with its source timestamp and status.
///
/// This is the unit returned by reads: the three fields are always taken
/// from the same committed write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// The value.
    pub value: Value,
    /// When the value was produced.
    pub source_timestamp: DateTime<Utc>,
    /// Quality of the value.
    pub status: StatusCode,
}

impl DataValue {
    /// Creates a good value stamped with the current time.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            source_timestamp: Utc::now(),
            status: StatusCode::GOOD,
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Whether a variable value may be written by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Current value is readable only.
    ReadOnly,
    /// Current value is readable and writable.
    #[default]
    ReadWrite,
}

impl AccessLevel {
    /// Returns `true` if writes are permitted.
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Bit set of attributes a client may change on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteMask(pub u32);

impl WriteMask {
    /// No attribute is writable.
    pub const NONE: WriteMask = WriteMask(0);
    /// The description attribute is writable.
    pub const DESCRIPTION: WriteMask = WriteMask(1 << 5);
    /// The display name attribute is writable.
    pub const DISPLAY_NAME: WriteMask = WriteMask(1 << 6);

    /// Returns `true` if every bit of `other` is set.
    #[inline]
    pub const fn contains(&self, other: WriteMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for WriteMask {
    type Output = WriteMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        WriteMask(self.0 | rhs.0)
    }
}

/// Semantic reference types between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Organisational reference (folders).
    Organizes,
    /// Component reference (methods, variables of an object).
    HasComponent,
    /// Property reference.
    HasProperty,
    /// Event notifier reference.
    HasNotifier,
}

impl ReferenceKind {
    /// Returns the reference type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Organizes => "Organizes",
            Self::HasComponent => "HasComponent",
            Self::HasProperty => "HasProperty",
            Self::HasNotifier => "HasNotifier",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Organisational folder.
    Folder,
    /// Live process variable.
    Variable,
    /// Invocable method.
    Method,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder => write!(f, "Folder"),
            Self::Variable => write!(f, "Variable"),
            Self::Method => write!(f, "Method"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::numeric(0, 85).to_string(), "i=85");
        assert_eq!(NodeId::string(2, "Controls").to_string(), "ns=2;s=Controls");
    }

    #[test]
    fn test_node_id_parse() {
        let id: NodeId = "ns=2;s=Controls_Mode".parse().unwrap();
        assert_eq!(id, NodeId::string(2, "Controls_Mode"));

        let id: NodeId = "i=85".parse().unwrap();
        assert_eq!(id, NodeId::OBJECTS_FOLDER);

        let uuid = Uuid::new_v4();
        let id: NodeId = format!("ns=3;g={}", uuid).parse().unwrap();
        assert_eq!(id, NodeId::guid(3, uuid));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("s=".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::from(true).data_type(), DataType::Boolean);
        assert_eq!(Value::from(2i16).data_type(), DataType::Int16);
        assert_eq!(Value::from(2.0f64).data_type(), DataType::Double);
        assert_eq!(Value::from("x").data_type(), DataType::String);
        assert_eq!(Value::Int16(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("x").as_f64(), None);
    }

    #[test]
    fn test_value_from_f64_as() {
        assert_eq!(Value::from_f64_as(DataType::Float, 0.5), Some(Value::Float(0.5)));
        assert_eq!(Value::from_f64_as(DataType::Double, 0.5), Some(Value::Double(0.5)));
        assert_eq!(Value::from_f64_as(DataType::Int16, 0.5), None);
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN_LAST_USABLE_VALUE.is_uncertain());
        assert!(StatusCode::BAD_TYPE_MISMATCH.is_bad());
        assert!(!StatusCode::BAD_TYPE_MISMATCH.is_good());
        assert_eq!(StatusCode::BAD_ARGUMENTS_MISSING.name(), "BadArgumentsMissing");
        assert_eq!(
            StatusCode::BAD_NODE_ID_EXISTS.to_string(),
            "BadNodeIdExists (0x805E0000)"
        );
    }

    #[test]
    fn test_write_mask() {
        let mask = WriteMask::DISPLAY_NAME | WriteMask::DESCRIPTION;
        assert!(mask.contains(WriteMask::DISPLAY_NAME));
        assert!(mask.contains(WriteMask::DESCRIPTION));
        assert!(!WriteMask::NONE.contains(WriteMask::DISPLAY_NAME));
    }

    #[test]
    fn test_value_serde() {
        let json = serde_json::to_string(&Value::Int16(2)).unwrap();
        assert_eq!(json, r#"{"type":"Int16","value":2}"#);
    }
}
