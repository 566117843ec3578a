//! Core types for the protofuzz instance generator.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ScalarKind`] / [`FieldType`] - Declared field types
//! - [`DescriptorSet`] - Validated message descriptors loaded from YAML
//! - [`FieldPath`] - Dotted field addresses across nested messages
//! - [`FuzzValue`] / [`ResolvedInstance`] - Generated values and records
//!
//! # Architecture
//!
//! ```text
//! fuzz-core (this crate)
//!    │
//!    ├─── fuzz-generator       (value sources, dependencies, permutation)
//!    │
//!    └─── fuzz-populate-jsonl  (writes instances as JSON Lines)
//! ```
//!
//! # Example
//!
//! ```rust
//! use fuzz_core::{DescriptorSet, FieldPath, FuzzValue, ResolvedInstance};
//!
//! let schema = DescriptorSet::from_yaml(r#"
//! messages:
//!   - name: Address
//!     fields:
//!       - name: house
//!         type: int32
//! "#).unwrap();
//! assert_eq!(schema.message_names(), vec!["Address"]);
//!
//! let mut instance = ResolvedInstance::new("Address");
//! instance.push("house", FuzzValue::Int(-1));
//! assert_eq!(
//!     instance.get_path(&FieldPath::field("house")),
//!     Some(&FuzzValue::Int(-1))
//! );
//! ```

pub mod path;
pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use path::{FieldPath, InvalidPath};
pub use schema::{
    DescriptorSet, FieldDescriptor, Label, MessageDescriptor, PathResolutionError,
    ResolvedField, SchemaError,
};
pub use types::{FieldType, ScalarKind};
pub use values::{FromFuzzValue, FuzzValue, IntoFuzzValue, ResolvedInstance, ValueShape};
