//! CLI argument definitions for instance generation.

use crate::populator::ErrorPolicy;
use clap::Args;
use fuzz_generator::Strategy;
use std::path::PathBuf;

/// Arguments shared by every command that builds fuzzers.
#[derive(Args, Clone, Debug)]
pub struct CommonFuzzArgs {
    /// Path to schema YAML file
    #[arg(long, short = 's')]
    pub schema: PathBuf,

    /// Specific message types (comma-separated, empty = all messages from schema)
    #[arg(long, value_delimiter = ',')]
    pub messages: Vec<String>,

    /// How independent fields are combined (permute or linear)
    #[arg(long, default_value = "permute")]
    pub strategy: Strategy,

    /// Maximum candidates per field (nested messages included)
    #[arg(long)]
    pub field_limit: Option<usize>,

    /// fuzzdb-style corpus directory (built-in corpus when unset)
    #[arg(long, env = "PROTOFUZZ_CORPUS")]
    pub corpus_dir: Option<PathBuf>,

    /// Drop corpus strings longer than this many bytes
    #[arg(long)]
    pub max_string_len: Option<usize>,
}

/// JSONL-specific generate arguments.
#[derive(Args, Clone, Debug)]
pub struct JsonlGenerateArgs {
    /// Output directory for JSONL files (one file per message)
    #[arg(long, short = 'o')]
    pub output_dir: PathBuf,

    /// Maximum instances per message (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub limit: u64,

    /// What to do with instances that fail type conformance
    #[arg(long, value_enum, default_value = "skip")]
    pub on_error: ErrorPolicy,

    /// File keeping the most recently written instances
    #[arg(long)]
    pub recent_log: Option<PathBuf>,

    /// Number of instances kept in the recent log (0 = all)
    ///
    /// The log is rewritten on every instance, so with 0 each write grows
    /// with the run and a long run costs quadratic I/O.
    #[arg(long, default_value = "10")]
    pub recent_size: usize,

    /// Partition index to generate
    #[arg(long, default_value = "0")]
    pub shard: usize,

    /// Total number of partitions
    #[arg(long, default_value = "1")]
    pub shards: usize,

    #[command(flatten)]
    pub common: CommonFuzzArgs,
}
