//! Error types for fuzzer construction, dependency attachment, and
//! per-instance value conformance.

use fuzz_core::{FieldPath, FuzzValue, SchemaError, ValueShape};
use std::fmt;
use std::path::PathBuf;

/// Error type for building and driving message fuzzers.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No fuzzer exists for the message type
    #[error("Message fuzzer not found: {0}")]
    MessageNotFound(String),

    /// Partition parameters are out of range
    #[error("Invalid partition {shard} of {shards}")]
    InvalidPartition { shard: usize, shards: usize },

    /// A configured dependency could not be attached
    #[error("Dependency on message '{message}' rejected: {source}")]
    Dependency {
        message: String,
        #[source]
        source: DependencyError,
    },

    /// Error reading a dependency configuration file
    #[error("Failed to read dependency configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a dependency configuration
    #[error("Failed to parse dependency configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Structural errors raised synchronously by `add_dependency`.
///
/// The fuzzer is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DependencyError {
    /// A path does not resolve to a field of the message
    #[error("Unknown field '{path}' in message '{message}': {reason}")]
    UnknownField {
        message: String,
        path: String,
        reason: String,
    },

    /// The edge would close a cycle among dependencies
    #[error("Dependency {target} <- {from} would create a cycle: {}", format_chain(.chain))]
    Cycle {
        target: FieldPath,
        from: FieldPath,
        chain: Vec<FieldPath>,
    },

    /// The target (or a field containing it) already has a dependency
    #[error("Field '{target}' already depends on '{existing}'")]
    Duplicate {
        target: FieldPath,
        existing: FieldPath,
    },

    /// The transform's declared shapes do not fit the fields
    #[error("Transform '{transform}' uses {transform_shape} at '{path}' but the field holds {field_shape}")]
    IncompatibleTransform {
        transform: String,
        path: FieldPath,
        transform_shape: ValueShape,
        field_shape: ValueShape,
    },
}

impl DependencyError {
    pub(crate) fn unknown_field(message: &str, path: &str, reason: impl fmt::Display) -> Self {
        Self::UnknownField {
            message: message.to_string(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn format_chain(chain: &[FieldPath]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" <- ")
}

/// A value that does not satisfy the declared type of the field it was
/// assigned to.
///
/// Raised once per offending instance during enumeration; the enumeration
/// itself continues with the next combination.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Type conformance failure at '{message}.{path}': {value} is not a valid {expected}")]
pub struct TypeConformanceError {
    /// Message the path is relative to
    pub message: String,
    /// Field that received (or supplied) the offending value
    pub path: FieldPath,
    /// The offending value
    pub value: FuzzValue,
    /// What the field or transform expected
    pub expected: String,
}

impl TypeConformanceError {
    /// Re-root the error at a parent message that holds the failing
    /// message in field `field`.
    pub fn nested_in(mut self, message: &str, field: &str) -> Self {
        self.message = message.to_string();
        self.path = self.path.prefixed(field);
        self
    }
}

/// Error loading a value corpus from disk.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Error reading a corpus directory or file
    #[error("Failed to read corpus at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An integer list contains a line that is not an integer
    #[error("Invalid integer '{value}' at {path}:{line}")]
    InvalidInteger {
        path: PathBuf,
        line: usize,
        value: String,
    },
}
