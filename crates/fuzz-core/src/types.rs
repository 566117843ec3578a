//! Field type universe for protofuzz schemas.
//!
//! This module defines `ScalarKind`, the set of scalar wire types a schema
//! field can declare, and `FieldType`, which adds enum and nested message
//! references on top of the scalars.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Scalar value kinds supported by the fuzzer.
///
/// The names follow the protobuf scalar type names so that descriptor sets
/// produced by a protobuf compiler map one-to-one onto this enum.
///
/// # YAML Format
///
/// ```yaml
/// type: int32
/// type: sfixed64
/// type: string
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// 32-bit signed integer (varint encoded)
    Int32,
    /// 64-bit signed integer (varint encoded)
    Int64,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit signed integer (zigzag encoded)
    SInt32,
    /// 64-bit signed integer (zigzag encoded)
    SInt64,
    /// 32-bit unsigned fixed-width integer
    Fixed32,
    /// 64-bit unsigned fixed-width integer
    Fixed64,
    /// 32-bit signed fixed-width integer
    SFixed32,
    /// 64-bit signed fixed-width integer
    SFixed64,
    /// 32-bit IEEE 754 floating point
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// UTF-8 string
    String,
    /// Arbitrary bytes
    Bytes,
}

impl ScalarKind {
    /// All scalar kinds, in declaration order.
    pub const ALL: [ScalarKind; 15] = [
        ScalarKind::Bool,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::SInt32,
        ScalarKind::SInt64,
        ScalarKind::Fixed32,
        ScalarKind::Fixed64,
        ScalarKind::SFixed32,
        ScalarKind::SFixed64,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::String,
        ScalarKind::Bytes,
    ];

    /// Schema name of this kind (`"int32"`, `"string"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }

    /// Look up a kind by its schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Check if this kind is an integer kind.
    pub fn is_integer(&self) -> bool {
        self.integer_width().is_some()
    }

    /// Check if this kind is a floating point kind.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Bit width and signedness of an integer kind.
    pub fn integer_width(&self) -> Option<(u32, bool)> {
        match self {
            Self::Int32 | Self::SInt32 | Self::SFixed32 => Some((32, true)),
            Self::Int64 | Self::SInt64 | Self::SFixed64 => Some((64, true)),
            Self::UInt32 | Self::Fixed32 => Some((32, false)),
            Self::UInt64 | Self::Fixed64 => Some((64, false)),
            _ => None,
        }
    }

    /// Inclusive range of values an integer kind can hold.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        self.integer_width().map(|(bits, signed)| {
            if signed {
                (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
            } else {
                (0, (1i128 << bits) - 1)
            }
        })
    }

    /// Check whether an integer fits this kind.
    ///
    /// Always false for non-integer kinds.
    pub fn fits(&self, value: i128) -> bool {
        self.integer_bounds()
            .is_some_and(|(min, max)| value >= min && value <= max)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a schema field.
///
/// # YAML Format
///
/// Scalars are plain strings:
/// ```yaml
/// type: int32
/// ```
///
/// Enums and message references use object format:
/// ```yaml
/// type:
///   type: message
///   name: Address
/// type:
///   type: enum
///   name: Color
///   values: [0, 1, 2]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar value
    Scalar(ScalarKind),

    /// Enumeration with its declared numbers
    Enum {
        /// Enum type name
        name: String,
        /// Declared enum numbers, in declaration order
        values: Vec<i32>,
    },

    /// Reference to another message type
    Message {
        /// Referenced message type name
        name: String,
    },
}

impl FieldType {
    /// Create a message reference type.
    pub fn message(name: impl Into<String>) -> Self {
        Self::Message { name: name.into() }
    }

    /// Create an enum type with the given numbers.
    pub fn enumeration(name: impl Into<String>, values: Vec<i32>) -> Self {
        Self::Enum {
            name: name.into(),
            values,
        }
    }

    /// The scalar kind, if this is a scalar type.
    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The referenced message name, if this is a message type.
    pub fn message_name(&self) -> Option<&str> {
        match self {
            Self::Message { name } => Some(name),
            _ => None,
        }
    }

    /// Check if this type references a nested message.
    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message { .. })
    }
}

impl From<ScalarKind> for FieldType {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Enum { name, .. } => write!(f, "enum {name}"),
            Self::Message { name } => write!(f, "message {name}"),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Scalar(kind) => serializer.serialize_str(kind.name()),
            Self::Enum { name, values } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            Self::Message { name } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "message")?;
                map.serialize_entry("name", name)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct FieldTypeVisitor;

        impl<'de> Visitor<'de> for FieldTypeVisitor {
            type Value = FieldType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a scalar type name or a map describing an enum or message")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                ScalarKind::from_name(value)
                    .map(FieldType::Scalar)
                    .ok_or_else(|| E::custom(format!("unknown scalar type: {value}")))
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;

                match type_name.as_str() {
                    "message" => {
                        let name = get_field_required(&fields, "name")?;
                        Ok(FieldType::Message { name })
                    }
                    "enum" => {
                        let name = get_field_required(&fields, "name")?;
                        let values = get_field_required(&fields, "values")?;
                        Ok(FieldType::Enum { name, values })
                    }
                    other => ScalarKind::from_name(other)
                        .map(FieldType::Scalar)
                        .ok_or_else(|| M::Error::custom(format!("unknown type: {other}"))),
                }
            }
        }

        deserializer.deserialize_any(FieldTypeVisitor)
    }
}

fn get_field_required<T: for<'de> Deserialize<'de>, E: serde::de::Error>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &'static str,
) -> Result<T, E> {
    let value = fields.get(key).ok_or_else(|| E::missing_field(key))?;
    serde_yaml::from_value(value.clone())
        .map_err(|e| E::custom(format!("invalid field '{key}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bounds() {
        assert_eq!(
            ScalarKind::Int32.integer_bounds(),
            Some((i32::MIN as i128, i32::MAX as i128))
        );
        assert_eq!(
            ScalarKind::Fixed64.integer_bounds(),
            Some((0, u64::MAX as i128))
        );
        assert_eq!(ScalarKind::String.integer_bounds(), None);

        assert!(ScalarKind::UInt32.fits(0));
        assert!(!ScalarKind::UInt32.fits(-1));
        assert!(ScalarKind::SInt32.fits(-1));
        assert!(!ScalarKind::SInt32.fits(0x8000_0000));
        assert!(!ScalarKind::Bool.fits(0));
    }

    #[test]
    fn test_kind_names_roundtrip_through_lookup() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarKind::from_name("int"), None);
    }

    #[test]
    fn test_deserialize_simple_string() {
        let parsed: FieldType = serde_yaml::from_str("uint32").unwrap();
        assert_eq!(parsed, FieldType::Scalar(ScalarKind::UInt32));

        let parsed: FieldType = serde_yaml::from_str("sfixed64").unwrap();
        assert_eq!(parsed, FieldType::Scalar(ScalarKind::SFixed64));

        assert!(serde_yaml::from_str::<FieldType>("varchar").is_err());
    }

    #[test]
    fn test_deserialize_complex_types() {
        let yaml = r#"
type: message
name: Address
"#;
        let parsed: FieldType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, FieldType::message("Address"));

        let yaml = r#"
type: enum
name: Color
values: [0, 1, 2]
"#;
        let parsed: FieldType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, FieldType::enumeration("Color", vec![0, 1, 2]));

        let yaml = r#"
type: enum
name: Color
"#;
        assert!(serde_yaml::from_str::<FieldType>(yaml).is_err());
    }

    #[test]
    fn test_serialize_message_reference() {
        let yaml = serde_yaml::to_string(&FieldType::message("Address")).unwrap();
        assert!(yaml.contains("type: message"));
        assert!(yaml.contains("name: Address"));

        let parsed: FieldType = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, FieldType::message("Address"));
    }
}
