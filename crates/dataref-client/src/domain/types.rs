//! Core domain types: dataref names, declared types, decoded values and
//! request identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::error::CodecError;

/// Name of a host-exposed simulator variable, e.g.
/// `sim/cockpit2/controls/parking_brake_ratio`.
///
/// The client treats the name as an opaque key. It only rejects text that
/// would corrupt the wire frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRefName(String);

impl DataRefName {
    /// Validate and wrap a dataref name.
    pub fn new(name: impl Into<String>) -> Result<Self, CodecError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.contains('|') {
            Some("name contains the field separator '|'")
        } else if name.chars().any(char::is_control) {
            Some("name contains control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CodecError::InvalidName {
                name,
                reason: reason.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataRefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DataRefName {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DataRefName {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DataRefName {
    type Error = CodecError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DataRefName> for String {
    fn from(name: DataRefName) -> Self {
        name.0
    }
}

impl AsRef<str> for DataRefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Declared type of a dataref. The wire tags are `int`, `float`, `[int]`
/// and `[float]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRefType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "[int]")]
    IntArray,
    #[serde(rename = "[float]")]
    FloatArray,
}

impl DataRefType {
    pub const ALL: [DataRefType; 4] = [
        DataRefType::Int,
        DataRefType::Float,
        DataRefType::IntArray,
        DataRefType::FloatArray,
    ];

    /// Wire tag for this type.
    pub fn as_wire(&self) -> &'static str {
        match self {
            DataRefType::Int => "int",
            DataRefType::Float => "float",
            DataRefType::IntArray => "[int]",
            DataRefType::FloatArray => "[float]",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataRefType::IntArray | DataRefType::FloatArray)
    }
}

impl fmt::Display for DataRefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for DataRefType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(DataRefType::Int),
            "float" => Ok(DataRefType::Float),
            "[int]" => Ok(DataRefType::IntArray),
            "[float]" => Ok(DataRefType::FloatArray),
            other => Err(CodecError::UnknownType(other.to_string())),
        }
    }
}

/// A decoded dataref value.
///
/// `Invalid` marks a read that produced no value. It never compares equal to
/// a legitimate value, so a failed read cannot pass for data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataRefValue {
    Int(i64),
    Float(f32),
    IntArray(Vec<i64>),
    FloatArray(Vec<f32>),
    Invalid,
}

impl DataRefValue {
    /// The declared type this value satisfies, `None` for `Invalid`.
    pub fn data_type(&self) -> Option<DataRefType> {
        match self {
            DataRefValue::Int(_) => Some(DataRefType::Int),
            DataRefValue::Float(_) => Some(DataRefType::Float),
            DataRefValue::IntArray(_) => Some(DataRefType::IntArray),
            DataRefValue::FloatArray(_) => Some(DataRefType::FloatArray),
            DataRefValue::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, DataRefValue::Invalid)
    }

    /// Short variant name, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            DataRefValue::Int(_) => "int",
            DataRefValue::Float(_) => "float",
            DataRefValue::IntArray(_) => "[int]",
            DataRefValue::FloatArray(_) => "[float]",
            DataRefValue::Invalid => "invalid",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataRefValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            DataRefValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn into_int_array(self) -> Option<Vec<i64>> {
        match self {
            DataRefValue::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_float_array(self) -> Option<Vec<f32>> {
        match self {
            DataRefValue::FloatArray(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for DataRefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            DataRefValue::Int(v) => write!(f, "{v}"),
            DataRefValue::Float(v) => write!(f, "{v}"),
            DataRefValue::IntArray(v) => join(f, v),
            DataRefValue::FloatArray(v) => join(f, v),
            DataRefValue::Invalid => f.write_str("<invalid>"),
        }
    }
}

/// Correlation token carried on the wire and echoed by the responder.
///
/// Generated ids are 128 random bits rendered as 32 lowercase hex digits.
/// Parsed ids accept any token the responder could echo back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh random id (UUID v4, simple hex form).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accept a token read off the wire or supplied by an id source.
    pub fn parse(token: &str) -> Result<Self, CodecError> {
        if token.is_empty() {
            return Err(CodecError::Malformed("empty request id".into()));
        }
        if token.contains('|') || token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CodecError::Malformed(format!(
                "request id {token:?} contains separator, whitespace or control characters"
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A decoded read request, as seen by a responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRefRequest {
    /// `None` for the legacy id-less form.
    pub request_id: Option<RequestId>,
    pub data_type: DataRefType,
    pub name: DataRefName,
}

/// A decoded read response.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRefResponse {
    /// `None` for the legacy id-less form.
    pub request_id: Option<RequestId>,
    pub data_type: DataRefType,
    pub value: DataRefValue,
}
