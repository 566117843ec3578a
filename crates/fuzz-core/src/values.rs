//! Value representations for generated instances.
//!
//! [`FuzzValue`] is the concrete value assigned to one field, and
//! [`ResolvedInstance`] is one fully populated record. [`ValueShape`] and the
//! [`FromFuzzValue`]/[`IntoFuzzValue`] traits let callers declare the value
//! shapes a typed transform consumes and produces.

use crate::path::FieldPath;
use crate::schema::FieldDescriptor;
use crate::types::{FieldType, ScalarKind};
use base64::Engine;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// A concrete value for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FuzzValue {
    /// Boolean value
    Bool(bool),

    /// Signed integer (any signed integer kind)
    Int(i64),

    /// Unsigned integer (any unsigned integer kind)
    UInt(u64),

    /// Floating point value (`float` and `double`)
    Float(f64),

    /// String value
    String(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Enum number
    Enum(i32),

    /// Nested message instance
    Message(ResolvedInstance),

    /// Values of a repeated field
    List(Vec<FuzzValue>),

    /// No value yet; never part of a yielded instance
    Null,
}

impl FuzzValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Shape of this value.
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Bool(_) => ValueShape::Bool,
            Self::Int(_) | Self::UInt(_) => ValueShape::Integer,
            Self::Float(_) => ValueShape::Float,
            Self::String(_) => ValueShape::String,
            Self::Bytes(_) => ValueShape::Bytes,
            Self::Enum(_) => ValueShape::Enum,
            Self::Message(_) => ValueShape::Message,
            Self::List(_) => ValueShape::List,
            Self::Null => ValueShape::Null,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as a wide integer (integers and enum numbers).
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(i) => Some(*i as i128),
            Self::UInt(u) => Some(*u as i128),
            Self::Enum(e) => Some(*e as i128),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get this value as a nested instance.
    pub fn as_message(&self) -> Option<&ResolvedInstance> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get this value as a list.
    pub fn as_list(&self) -> Option<&[FuzzValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Convert to a JSON value. Bytes are base64 encoded.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::UInt(u) => serde_json::Value::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
            Self::Enum(e) => serde_json::Value::from(*e),
            Self::Message(m) => m.to_json(),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(FuzzValue::to_json).collect())
            }
            Self::Null => serde_json::Value::Null,
        }
    }
}

impl Serialize for FuzzValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Enum(e) => serializer.serialize_i32(*e),
            Self::Message(m) => m.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Null => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for FuzzValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Self::Enum(e) => write!(f, "{e}"),
            Self::Message(m) => write!(f, "{{ {m} }}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for FuzzValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FuzzValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for FuzzValue {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for FuzzValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for FuzzValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FuzzValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for FuzzValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<ResolvedInstance> for FuzzValue {
    fn from(m: ResolvedInstance) -> Self {
        Self::Message(m)
    }
}

// ============================================================================
// Value shapes
// ============================================================================

/// The coarse shape of a value, used to type-check transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Any value
    Any,
    /// Booleans
    Bool,
    /// Signed or unsigned integers
    Integer,
    /// Floating point numbers
    Float,
    /// Strings
    String,
    /// Byte strings
    Bytes,
    /// Enum numbers
    Enum,
    /// Nested message instances
    Message,
    /// Repeated field values
    List,
    /// The null placeholder
    Null,
}

impl ValueShape {
    /// Shape of the values a field holds.
    pub fn of_field(field: &FieldDescriptor) -> Self {
        if field.is_repeated() {
            return Self::List;
        }
        match &field.field_type {
            FieldType::Scalar(kind) if kind.is_integer() => Self::Integer,
            FieldType::Scalar(kind) if kind.is_float() => Self::Float,
            FieldType::Scalar(ScalarKind::Bool) => Self::Bool,
            FieldType::Scalar(ScalarKind::String) => Self::String,
            FieldType::Scalar(_) => Self::Bytes,
            FieldType::Enum { .. } => Self::Enum,
            FieldType::Message { .. } => Self::Message,
        }
    }

    /// Check whether a consumer declared with this shape accepts values of
    /// shape `other`.
    ///
    /// Integer consumers also accept enum numbers.
    pub fn accepts(&self, other: ValueShape) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::Integer, Self::Enum) => true,
            (a, b) => *a == b,
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum => "enum",
            Self::Message => "message",
            Self::List => "list",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

/// Types a transform can take as its input.
pub trait FromFuzzValue: Sized {
    /// Shape of the values this type can be extracted from.
    const SHAPE: ValueShape;

    /// Extract a value, or `None` if the value has a different shape or
    /// does not fit.
    fn from_fuzz_value(value: &FuzzValue) -> Option<Self>;
}

/// Types a transform can produce.
pub trait IntoFuzzValue {
    /// Shape of the produced values.
    const SHAPE: ValueShape;

    /// Wrap into a [`FuzzValue`].
    fn into_fuzz_value(self) -> FuzzValue;
}

impl FromFuzzValue for FuzzValue {
    const SHAPE: ValueShape = ValueShape::Any;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl IntoFuzzValue for FuzzValue {
    const SHAPE: ValueShape = ValueShape::Any;

    fn into_fuzz_value(self) -> FuzzValue {
        self
    }
}

impl FromFuzzValue for bool {
    const SHAPE: ValueShape = ValueShape::Bool;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_bool()
    }
}

impl IntoFuzzValue for bool {
    const SHAPE: ValueShape = ValueShape::Bool;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::Bool(self)
    }
}

impl FromFuzzValue for i64 {
    const SHAPE: ValueShape = ValueShape::Integer;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_i128().and_then(|v| i64::try_from(v).ok())
    }
}

impl IntoFuzzValue for i64 {
    const SHAPE: ValueShape = ValueShape::Integer;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::Int(self)
    }
}

impl FromFuzzValue for u64 {
    const SHAPE: ValueShape = ValueShape::Integer;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_i128().and_then(|v| u64::try_from(v).ok())
    }
}

impl IntoFuzzValue for u64 {
    const SHAPE: ValueShape = ValueShape::Integer;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::UInt(self)
    }
}

impl FromFuzzValue for i128 {
    const SHAPE: ValueShape = ValueShape::Integer;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_i128()
    }
}

impl IntoFuzzValue for i128 {
    const SHAPE: ValueShape = ValueShape::Integer;

    /// Values outside the `i64`/`u64` range become `Null` and fail
    /// conformance for every integer field.
    fn into_fuzz_value(self) -> FuzzValue {
        if let Ok(i) = i64::try_from(self) {
            FuzzValue::Int(i)
        } else if let Ok(u) = u64::try_from(self) {
            FuzzValue::UInt(u)
        } else {
            FuzzValue::Null
        }
    }
}

impl FromFuzzValue for f64 {
    const SHAPE: ValueShape = ValueShape::Float;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_f64()
    }
}

impl IntoFuzzValue for f64 {
    const SHAPE: ValueShape = ValueShape::Float;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::Float(self)
    }
}

impl FromFuzzValue for String {
    const SHAPE: ValueShape = ValueShape::String;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl IntoFuzzValue for String {
    const SHAPE: ValueShape = ValueShape::String;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::String(self)
    }
}

impl FromFuzzValue for Vec<u8> {
    const SHAPE: ValueShape = ValueShape::Bytes;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl IntoFuzzValue for Vec<u8> {
    const SHAPE: ValueShape = ValueShape::Bytes;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::Bytes(self)
    }
}

impl FromFuzzValue for ResolvedInstance {
    const SHAPE: ValueShape = ValueShape::Message;

    fn from_fuzz_value(value: &FuzzValue) -> Option<Self> {
        value.as_message().cloned()
    }
}

impl IntoFuzzValue for ResolvedInstance {
    const SHAPE: ValueShape = ValueShape::Message;

    fn into_fuzz_value(self) -> FuzzValue {
        FuzzValue::Message(self)
    }
}

// ============================================================================
// Resolved instances
// ============================================================================

/// One concrete assignment of every field of a message.
///
/// Fields are kept in schema declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    /// Message type name
    message: String,

    /// Field values, in declaration order
    fields: Vec<(String, FuzzValue)>,
}

impl ResolvedInstance {
    /// Create an instance with no fields.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Create an instance from `(name, value)` pairs.
    pub fn with_fields(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = (String, FuzzValue)>,
    ) -> Self {
        Self {
            message: message.into(),
            fields: fields.into_iter().collect(),
        }
    }

    /// Message type name.
    pub fn message_type(&self) -> &str {
        &self.message
    }

    /// Append a field value.
    pub fn push(&mut self, name: impl Into<String>, value: FuzzValue) {
        self.fields.push((name.into(), value));
    }

    /// Get a top-level field value.
    pub fn get(&self, name: &str) -> Option<&FuzzValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a mutable reference to a top-level field value.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FuzzValue> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get a value by path, descending into nested instances.
    pub fn get_path(&self, path: &FieldPath) -> Option<&FuzzValue> {
        let mut current = self;
        let segments = path.segments();
        for (depth, segment) in segments.iter().enumerate() {
            let value = current.get(segment)?;
            if depth + 1 == segments.len() {
                return Some(value);
            }
            current = value.as_message()?;
        }
        None
    }

    /// Replace a value by path. Hands the value back if the path does not
    /// exist in this instance.
    pub fn set_path(&mut self, path: &FieldPath, value: FuzzValue) -> Result<(), FuzzValue> {
        let Some(slot) = self.get_mut(path.head()) else {
            return Err(value);
        };
        match path.tail() {
            None => {
                *slot = value;
                Ok(())
            }
            Some(rest) => match slot {
                FuzzValue::Message(nested) => nested.set_path(&rest, value),
                _ => Err(value),
            },
        }
    }

    /// Iterate over `(name, value)` pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FuzzValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the instance has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl Serialize for ResolvedInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for ResolvedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(house: i64, street: &str) -> ResolvedInstance {
        ResolvedInstance::with_fields(
            "Address",
            vec![
                ("house".to_string(), FuzzValue::Int(house)),
                ("street".to_string(), FuzzValue::from(street)),
            ],
        )
    }

    #[test]
    fn test_get_and_set_path() {
        let mut other = ResolvedInstance::with_fields(
            "Other",
            vec![
                ("addr".to_string(), FuzzValue::Message(address(-1, "!"))),
                ("foo".to_string(), FuzzValue::Null),
            ],
        );

        let house = FieldPath::parse("addr.house").unwrap();
        assert_eq!(other.get_path(&house), Some(&FuzzValue::Int(-1)));

        assert_eq!(other.set_path(&FieldPath::field("foo"), FuzzValue::UInt(0)), Ok(()));
        assert_eq!(other.get("foo"), Some(&FuzzValue::UInt(0)));

        assert_eq!(other.set_path(&house, FuzzValue::Int(7)), Ok(()));
        assert_eq!(other.get_path(&house), Some(&FuzzValue::Int(7)));

        assert_eq!(
            other.set_path(&FieldPath::parse("foo.bar").unwrap(), FuzzValue::Int(1)),
            Err(FuzzValue::Int(1))
        );
        assert_eq!(
            other.set_path(&FieldPath::field("nope"), FuzzValue::Int(2)),
            Err(FuzzValue::Int(2))
        );
        assert!(other.get_path(&FieldPath::parse("addr.nope").unwrap()).is_none());
    }

    #[test]
    fn test_to_json() {
        let instance = ResolvedInstance::with_fields(
            "Blob",
            vec![
                ("addr".to_string(), FuzzValue::Message(address(256, "!"))),
                ("data".to_string(), FuzzValue::Bytes(b"hi".to_vec())),
                (
                    "tags".to_string(),
                    FuzzValue::List(vec![FuzzValue::from("a")]),
                ),
                ("big".to_string(), FuzzValue::UInt(u64::MAX)),
            ],
        );

        let json = instance.to_json();
        assert_eq!(json["addr"]["house"], 256);
        assert_eq!(json["addr"]["street"], "!");
        assert_eq!(json["data"], "aGk=");
        assert_eq!(json["tags"][0], "a");
        assert_eq!(json["big"], u64::MAX);

        // serde serialization agrees with to_json
        assert_eq!(serde_json::to_value(&instance).unwrap(), json);
    }

    #[test]
    fn test_display() {
        assert_eq!(address(-1, "!").to_string(), "house: -1 street: \"!\"");
        assert_eq!(ResolvedInstance::new("Empty").to_string(), "");
    }

    #[test]
    fn test_shapes() {
        assert_eq!(
            ValueShape::of_field(&FieldDescriptor::new("a", ScalarKind::SFixed32)),
            ValueShape::Integer
        );
        assert_eq!(
            ValueShape::of_field(&FieldDescriptor::repeated("a", ScalarKind::Int32)),
            ValueShape::List
        );
        assert_eq!(
            ValueShape::of_field(&FieldDescriptor::new("a", ScalarKind::Bytes)),
            ValueShape::Bytes
        );
        assert!(ValueShape::Integer.accepts(ValueShape::Enum));
        assert!(ValueShape::Any.accepts(ValueShape::Message));
        assert!(!ValueShape::String.accepts(ValueShape::Integer));
    }

    #[test]
    fn test_typed_extraction() {
        assert_eq!(i64::from_fuzz_value(&FuzzValue::UInt(5)), Some(5));
        assert_eq!(i64::from_fuzz_value(&FuzzValue::UInt(u64::MAX)), None);
        assert_eq!(u64::from_fuzz_value(&FuzzValue::Int(-1)), None);
        assert_eq!(String::from_fuzz_value(&FuzzValue::Int(1)), None);
        assert_eq!((i128::MAX).into_fuzz_value(), FuzzValue::Null);
        assert_eq!((-3i128).into_fuzz_value(), FuzzValue::Int(-3));
    }
}
