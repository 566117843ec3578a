//! Error types for the JSONL populator.

use fuzz_generator::{GeneratorError, TypeConformanceError};
use thiserror::Error;

/// Errors that can occur while writing instances.
#[derive(Error, Debug)]
pub enum JsonlPopulatorError {
    /// Message type not found in the fuzzer set.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fuzzer error.
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// An instance did not conform and the policy is to abort.
    #[error("Aborted on non-conforming instance: {0}")]
    Conformance(#[from] TypeConformanceError),
}
