//! Value permutation and dependency resolution engine for protofuzz.
//!
//! This crate turns a [`DescriptorSet`](fuzz_core::DescriptorSet) and a
//! [`ValueSource`] into deterministic, lazily produced streams of
//! [`ResolvedInstance`](fuzz_core::ResolvedInstance)s, one stream per
//! message type.
//!
//! # Architecture
//!
//! ```text
//! DescriptorSet ──┐      ValueSource
//!                 ▼          │
//!          build_fuzzers ◄───┘
//!                 │
//!                 ▼
//! ┌──────────────────────────────┐
//! │        MessageFuzzer         │
//! │                              │
//! │  - FieldFuzzer per field     │
//! │    (Scalar | Message)        │
//! │  - DependencyGraph           │
//! └──────────────┬───────────────┘
//!                │ permute() / linear()
//!                ▼
//!     Permutation (lazy iterator)
//!                │
//!                ▼
//!   Result<ResolvedInstance, TypeConformanceError>
//! ```
//!
//! # Example
//!
//! ```rust
//! use fuzz_core::{DescriptorSet, FuzzValue, ScalarKind};
//! use fuzz_generator::{build_fuzzers, StaticValueSource, Transform};
//!
//! let schema = DescriptorSet::from_yaml(r#"
//! messages:
//!   - name: Address
//!     fields:
//!       - name: house
//!         type: int32
//!       - name: street
//!         type: string
//!   - name: Other
//!     fields:
//!       - name: addr
//!         type:
//!           type: message
//!           name: Address
//!       - name: foo
//!         type: uint32
//! "#).unwrap();
//!
//! let source = StaticValueSource::new()
//!     .with(ScalarKind::Int32, [-1i64, 0, 256])
//!     .with(ScalarKind::String, ["!"]);
//! let mut fuzzers = build_fuzzers(&schema, &source).unwrap();
//!
//! let other = fuzzers.get_mut("Other").unwrap();
//! other
//!     .add_dependency("foo", "addr.house", Transform::new("increment", |x: i128| x + 1))
//!     .unwrap();
//!
//! let foos: Vec<FuzzValue> = other
//!     .permute()
//!     .map(|instance| instance.unwrap().get("foo").cloned().unwrap())
//!     .collect();
//! assert_eq!(foos, vec![FuzzValue::UInt(0), FuzzValue::UInt(1), FuzzValue::UInt(257)]);
//! ```

pub mod config;
pub mod conformance;
pub mod dependency;
pub mod error;
pub mod field;
pub mod fuzzer;
pub mod permutation;
pub mod source;
pub mod transform;

// Re-exports for convenience
pub use config::{DependencyConfig, DependencySet};
pub use dependency::{Dependency, DependencyGraph};
pub use error::{CorpusError, DependencyError, GeneratorError, TypeConformanceError};
pub use field::{Candidates, FieldFuzzer, MessageFieldFuzzer, ScalarFieldFuzzer};
pub use fuzzer::{build_fuzzers, build_fuzzers_with_options, FuzzerOptions, MessageFuzzer};
pub use permutation::{Permutation, Strategy};
pub use source::{CorpusOptions, CorpusValueSource, StaticValueSource, ValueSource};
pub use transform::{Transform, TransformConfig};
