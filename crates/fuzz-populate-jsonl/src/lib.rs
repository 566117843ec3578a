//! JSONL (JSON Lines) writer for protofuzz instance streams.
//!
//! This crate drains a [`MessageFuzzer`](fuzz_generator::MessageFuzzer)
//! enumeration into a file holding one JSON object per instance, optionally
//! mirroring the last few instances into a crash log.
//!
//! # Example
//!
//! ```ignore
//! use fuzz_generator::{build_fuzzers, CorpusValueSource};
//! use fuzz_populate_jsonl::{EnumerationPlan, ErrorPolicy, JsonlPopulator};
//!
//! let fuzzers = build_fuzzers(&schema, &CorpusValueSource::new())?;
//! let mut populator = JsonlPopulator::new(ErrorPolicy::Skip);
//!
//! let metrics = populator.populate(&fuzzers["Address"], "Address.jsonl", &EnumerationPlan::default())?;
//! println!("Generated {} instances in {:?}", metrics.instances_written, metrics.total_duration);
//! ```

pub mod args;
pub mod error;
pub mod populator;
pub mod recent;

pub use args::{CommonFuzzArgs, JsonlGenerateArgs};
pub use error::JsonlPopulatorError;
pub use populator::{EnumerationPlan, ErrorPolicy, JsonlPopulator, PopulateMetrics};
pub use recent::{RecentEntry, RecentInstancesLog};
