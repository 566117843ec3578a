//! Schema descriptors consumed by the fuzzer.
//!
//! A [`DescriptorSet`] is the compiled form of a textual schema: a list of
//! message types, each with named, typed fields. Descriptor sets are loaded
//! from YAML (usually emitted by an external schema compiler) and validated
//! eagerly, so every later stage can assume:
//!
//! - message names are unique, field names are unique within a message
//! - every message reference points at a declared message
//! - the message-type graph is acyclic
//!
//! ## YAML format
//!
//! ```yaml
//! version: 1
//! messages:
//!   - name: Address
//!     fields:
//!       - name: house
//!         type: int32
//!       - name: street
//!         type: string
//!         label: optional
//!   - name: Other
//!     fields:
//!       - name: addr
//!         type:
//!           type: message
//!           name: Address
//!       - name: foo
//!         type: uint32
//! ```

use crate::path::FieldPath;
use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Message not found in schema
    #[error("Message type not found: {0}")]
    MessageNotFound(String),

    /// Two messages share a name
    #[error("Duplicate message type: {0}")]
    DuplicateMessage(String),

    /// Two fields of one message share a name
    #[error("Duplicate field '{field}' in message '{message}'")]
    DuplicateField { message: String, field: String },

    /// Field name is empty or contains a path separator
    #[error("Invalid field name '{field}' in message '{message}'")]
    InvalidFieldName { message: String, field: String },

    /// Field references a message type that is not declared
    #[error("Field '{field}' in message '{message}' references unknown message type '{referenced}'")]
    UnknownMessageType {
        message: String,
        field: String,
        referenced: String,
    },

    /// The message-type graph contains a cycle
    #[error("Recursive message types are not supported: {}", cycle.join(" -> "))]
    RecursiveMessage { cycle: Vec<String> },
}

/// Reason a field path failed to resolve against a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathResolutionError {
    /// No field with this name at this level
    #[error("no field named '{segment}'")]
    NoSuchField { segment: String },

    /// Path continues below a field that is not a message
    #[error("field '{segment}' is not a message")]
    NotAMessage { segment: String },

    /// Path continues below a repeated message field
    #[error("field '{segment}' is repeated and cannot be traversed")]
    ThroughRepeated { segment: String },

    /// Message referenced along the path is not declared
    #[error("message type '{0}' not found")]
    MessageNotFound(String),
}

// ============================================================================
// Descriptors
// ============================================================================

/// Field cardinality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Exactly one value
    #[default]
    Required,
    /// Zero or one value
    Optional,
    /// Any number of values
    Repeated,
}

/// Field descriptor: name, declared type, and cardinality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within its message
    pub name: String,

    /// Declared field type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Cardinality
    #[serde(default)]
    pub label: Label,
}

impl FieldDescriptor {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            label: Label::Required,
        }
    }

    /// Create a new optional field.
    pub fn optional(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            label: Label::Optional,
            ..Self::new(name, field_type)
        }
    }

    /// Create a new repeated field.
    pub fn repeated(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            label: Label::Repeated,
            ..Self::new(name, field_type)
        }
    }

    /// Check if this field holds a list of values.
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

/// Message type descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    /// Message type name
    pub name: String,

    /// Fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Create a new message descriptor.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the declaration index of a field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Get all field names, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// A field reached by resolving a [`FieldPath`].
#[derive(Debug, Clone)]
pub struct ResolvedField<'a> {
    /// Descriptor of the addressed field
    pub descriptor: &'a FieldDescriptor,

    /// Declaration index of every segment, outermost first.
    ///
    /// Comparing these lexicographically orders paths by schema declaration.
    pub declaration_key: Vec<usize>,
}

fn default_version() -> u32 {
    1
}

/// A validated set of message descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorSet {
    /// Descriptor format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Message types, in declaration order
    pub messages: Vec<MessageDescriptor>,

    /// Cached message lookup (not serialized)
    #[serde(skip)]
    message_map: HashMap<String, usize>,
}

impl DescriptorSet {
    /// Build a descriptor set from message descriptors, validating it.
    pub fn new(messages: Vec<MessageDescriptor>) -> Result<Self, SchemaError> {
        let mut set = Self {
            version: default_version(),
            messages,
            message_map: HashMap::new(),
        };
        set.build_message_map()?;
        set.validate()?;
        Ok(set)
    }

    /// Load descriptors from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse descriptors from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let mut set: DescriptorSet = serde_yaml::from_str(yaml)?;
        set.build_message_map()?;
        set.validate()?;
        Ok(set)
    }

    /// Build the internal message lookup map.
    fn build_message_map(&mut self) -> Result<(), SchemaError> {
        self.message_map.clear();
        for (idx, message) in self.messages.iter().enumerate() {
            if self.message_map.insert(message.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateMessage(message.name.clone()));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for message in &self.messages {
            let mut seen = std::collections::HashSet::new();
            for field in &message.fields {
                if field.name.is_empty() || field.name.contains('.') {
                    return Err(SchemaError::InvalidFieldName {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if let Some(referenced) = field.field_type.message_name() {
                    if !self.message_map.contains_key(referenced) {
                        return Err(SchemaError::UnknownMessageType {
                            message: message.name.clone(),
                            field: field.name.clone(),
                            referenced: referenced.to_string(),
                        });
                    }
                }
            }
        }

        // Depth-first search over message references; a message reached
        // again while still on the stack closes a cycle.
        let mut done = vec![false; self.messages.len()];
        for idx in 0..self.messages.len() {
            let mut stack = Vec::new();
            self.check_acyclic(idx, &mut stack, &mut done)?;
        }
        Ok(())
    }

    fn check_acyclic(
        &self,
        idx: usize,
        stack: &mut Vec<usize>,
        done: &mut [bool],
    ) -> Result<(), SchemaError> {
        if done[idx] {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|&i| i == idx) {
            let mut cycle: Vec<String> = stack[pos..]
                .iter()
                .map(|&i| self.messages[i].name.clone())
                .collect();
            cycle.push(self.messages[idx].name.clone());
            return Err(SchemaError::RecursiveMessage { cycle });
        }

        stack.push(idx);
        for field in &self.messages[idx].fields {
            if let Some(next) = field
                .field_type
                .message_name()
                .and_then(|name| self.message_map.get(name))
            {
                self.check_acyclic(*next, stack, done)?;
            }
        }
        stack.pop();
        done[idx] = true;
        Ok(())
    }

    /// Get a message descriptor by name.
    pub fn get_message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.message_map
            .get(name)
            .and_then(|&idx| self.messages.get(idx))
    }

    /// Get a message descriptor by name, or fail.
    pub fn require_message(&self, name: &str) -> Result<&MessageDescriptor, SchemaError> {
        self.get_message(name)
            .ok_or_else(|| SchemaError::MessageNotFound(name.to_string()))
    }

    /// Get all message names, in declaration order.
    pub fn message_names(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.name.as_str()).collect()
    }

    /// Resolve a field path relative to a message type.
    pub fn resolve_path(
        &self,
        message: &str,
        path: &FieldPath,
    ) -> Result<ResolvedField<'_>, PathResolutionError> {
        let mut current = self
            .get_message(message)
            .ok_or_else(|| PathResolutionError::MessageNotFound(message.to_string()))?;
        let mut declaration_key = Vec::with_capacity(path.depth());
        let segments = path.segments();

        for (depth, segment) in segments.iter().enumerate() {
            let idx = current
                .field_index(segment)
                .ok_or_else(|| PathResolutionError::NoSuchField {
                    segment: segment.clone(),
                })?;
            declaration_key.push(idx);
            let field = &current.fields[idx];

            if depth + 1 == segments.len() {
                return Ok(ResolvedField {
                    descriptor: field,
                    declaration_key,
                });
            }

            let nested = field.field_type.message_name().ok_or_else(|| {
                PathResolutionError::NotAMessage {
                    segment: segment.clone(),
                }
            })?;
            if field.is_repeated() {
                return Err(PathResolutionError::ThroughRepeated {
                    segment: segment.clone(),
                });
            }
            current = self
                .get_message(nested)
                .ok_or_else(|| PathResolutionError::MessageNotFound(nested.to_string()))?;
        }

        // FieldPath is never empty, so the loop always returns.
        Err(PathResolutionError::NoSuchField {
            segment: path.to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;

    const SAMPLE_SCHEMA: &str = r#"
version: 1

messages:
  - name: Address
    fields:
      - name: house
        type: int32
      - name: street
        type: string

  - name: Other
    fields:
      - name: addr
        type:
          type: message
          name: Address
      - name: foo
        type: uint32
      - name: history
        type:
          type: message
          name: Address
        label: repeated
"#;

    #[test]
    fn test_parse_descriptor_set() {
        let set = DescriptorSet::from_yaml(SAMPLE_SCHEMA).unwrap();

        assert_eq!(set.version, 1);
        assert_eq!(set.message_names(), vec!["Address", "Other"]);

        let address = set.get_message("Address").unwrap();
        assert_eq!(address.field_names(), vec!["house", "street"]);
        assert_eq!(
            address.get_field("house").unwrap().field_type,
            FieldType::Scalar(ScalarKind::Int32)
        );
        assert_eq!(address.get_field("street").unwrap().label, Label::Required);

        let other = set.get_message("Other").unwrap();
        assert!(other.get_field("history").unwrap().is_repeated());
    }

    #[test]
    fn test_message_not_found() {
        let set = DescriptorSet::from_yaml(SAMPLE_SCHEMA).unwrap();
        assert!(set.get_message("Nope").is_none());
        assert!(matches!(
            set.require_message("Nope"),
            Err(SchemaError::MessageNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = DescriptorSet::new(vec![MessageDescriptor::new(
            "Dup",
            vec![
                FieldDescriptor::new("a", ScalarKind::Int32),
                FieldDescriptor::new("a", ScalarKind::String),
            ],
        )]);
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_duplicate_message_rejected() {
        let result = DescriptorSet::new(vec![
            MessageDescriptor::new("A", vec![]),
            MessageDescriptor::new("A", vec![]),
        ]);
        assert!(matches!(result, Err(SchemaError::DuplicateMessage(_))));
    }

    #[test]
    fn test_dotted_field_name_rejected() {
        let result = DescriptorSet::new(vec![MessageDescriptor::new(
            "A",
            vec![FieldDescriptor::new("a.b", ScalarKind::Int32)],
        )]);
        assert!(matches!(result, Err(SchemaError::InvalidFieldName { .. })));
    }

    #[test]
    fn test_unknown_message_reference_rejected() {
        let result = DescriptorSet::new(vec![MessageDescriptor::new(
            "A",
            vec![FieldDescriptor::new("b", FieldType::message("B"))],
        )]);
        assert!(matches!(
            result,
            Err(SchemaError::UnknownMessageType { referenced, .. }) if referenced == "B"
        ));
    }

    #[test]
    fn test_recursive_messages_rejected() {
        let result = DescriptorSet::new(vec![
            MessageDescriptor::new("A", vec![FieldDescriptor::new("b", FieldType::message("B"))]),
            MessageDescriptor::new(
                "B",
                vec![FieldDescriptor::optional("a", FieldType::message("A"))],
            ),
        ]);
        match result {
            Err(SchemaError::RecursiveMessage { cycle }) => {
                assert_eq!(cycle, vec!["A", "B", "A"]);
            }
            other => panic!("expected RecursiveMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_nested_type_is_not_a_cycle() {
        let set = DescriptorSet::new(vec![
            MessageDescriptor::new("Leaf", vec![FieldDescriptor::new("v", ScalarKind::Bool)]),
            MessageDescriptor::new(
                "Root",
                vec![
                    FieldDescriptor::new("left", FieldType::message("Leaf")),
                    FieldDescriptor::new("right", FieldType::message("Leaf")),
                ],
            ),
        ]);
        assert!(set.is_ok());
    }

    #[test]
    fn test_resolve_path() {
        let set = DescriptorSet::from_yaml(SAMPLE_SCHEMA).unwrap();

        let house = set
            .resolve_path("Other", &FieldPath::parse("addr.house").unwrap())
            .unwrap();
        assert_eq!(house.descriptor.name, "house");
        assert_eq!(house.declaration_key, vec![0, 0]);

        let foo = set
            .resolve_path("Other", &FieldPath::field("foo"))
            .unwrap();
        assert_eq!(foo.declaration_key, vec![1]);

        assert_eq!(
            set.resolve_path("Other", &FieldPath::parse("addr.nope").unwrap())
                .unwrap_err(),
            PathResolutionError::NoSuchField {
                segment: "nope".to_string()
            }
        );
        assert!(matches!(
            set.resolve_path("Other", &FieldPath::parse("foo.bar").unwrap()),
            Err(PathResolutionError::NotAMessage { .. })
        ));
        assert!(matches!(
            set.resolve_path("Other", &FieldPath::parse("history.house").unwrap()),
            Err(PathResolutionError::ThroughRepeated { .. })
        ));
        // The repeated field itself is addressable
        assert!(set
            .resolve_path("Other", &FieldPath::field("history"))
            .is_ok());
    }
}
