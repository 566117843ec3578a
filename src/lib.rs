//! protofuzz library
//!
//! Generates deterministic streams of message instances for fuzzing,
//! permuting boundary values across every field of a schema's message types.
//!
//! # Crates
//!
//! - `fuzz_core` - Schema descriptors, field paths, values and instances
//! - `fuzz_generator` - Value sources, dependencies and the permutation engine
//! - `fuzz_populate_jsonl` - JSON Lines output and the recent-instances log
//!
//! # CLI Usage
//!
//! ```bash
//! # Show every message type and how many instances it yields
//! protofuzz list --schema schema.yaml
//!
//! # Write one JSONL file per message type
//! protofuzz generate --schema schema.yaml --output-dir out --limit 10000
//!
//! # Third of four partitions, zipping fields instead of permuting them
//! protofuzz generate --schema schema.yaml --output-dir out \
//!   --strategy linear --shard 2 --shards 4
//! ```
//!
//! # Schema file
//!
//! Message types and, optionally, dependencies between their fields live in
//! one YAML file:
//!
//! ```yaml
//! messages:
//!   - name: Address
//!     fields:
//!       - name: house
//!         type: int32
//!       - name: street
//!         type: string
//! dependencies:
//!   Address:
//!     - target: house
//!       source: street
//!       transform:
//!         type: length
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fuzz_core::DescriptorSet;
use fuzz_generator::{
    build_fuzzers_with_options, CorpusOptions, CorpusValueSource, DependencySet, FuzzerOptions,
    MessageFuzzer, Strategy,
};
use fuzz_populate_jsonl::{
    CommonFuzzArgs, EnumerationPlan, JsonlGenerateArgs, JsonlPopulator, PopulateMetrics,
    RecentInstancesLog,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "protofuzz")]
#[command(about = "Generate permuted message instances for fuzzing")]
#[command(long_about = None)]
pub struct Cli {
    /// Log filter (e.g. "info", "fuzz_generator=debug"); RUST_LOG when unset
    #[arg(long, global = true, env = "PROTOFUZZ_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List message types with their field and instance counts
    List {
        #[command(flatten)]
        args: ListArgs,
    },

    /// Write the instances of each message type to a JSONL file
    Generate {
        #[command(flatten)]
        args: JsonlGenerateArgs,
    },
}

/// Arguments of the `list` command.
#[derive(Args, Clone, Debug)]
pub struct ListArgs {
    /// Print one JSON object per message instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonFuzzArgs,
}

/// Summary of one message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub message: String,
    pub fields: usize,
    pub dependencies: usize,
    pub strategy: Strategy,
    /// `None` when the count does not fit in 128 bits
    pub instances: Option<u128>,
}

/// Load the schema, build a fuzzer per message type and attach the
/// dependencies configured in the schema file.
pub fn load_fuzzers(
    common: &CommonFuzzArgs,
) -> anyhow::Result<(DescriptorSet, BTreeMap<String, MessageFuzzer>)> {
    let schema = DescriptorSet::from_file(&common.schema)
        .with_context(|| format!("Failed to load schema from {:?}", common.schema))?;

    let source = match &common.corpus_dir {
        Some(dir) => CorpusValueSource::from_dir(dir)
            .with_context(|| format!("Failed to load corpus from {dir:?}"))?,
        None => CorpusValueSource::new(),
    }
    .with_options(CorpusOptions {
        max_string_len: common.max_string_len,
        string_limit: None,
    });

    let options = FuzzerOptions {
        field_limit: common.field_limit,
    };
    let mut fuzzers = build_fuzzers_with_options(&schema, &source, &options)
        .context("Failed to build message fuzzers")?;

    let dependencies = DependencySet::from_file(&common.schema).with_context(|| {
        format!("Failed to load dependencies from {:?}", common.schema)
    })?;
    dependencies
        .apply(&mut fuzzers)
        .context("Failed to attach dependencies")?;

    Ok((schema, fuzzers))
}

/// The message types named on the command line, or every type in schema
/// order when none are.
pub fn selected_messages(schema: &DescriptorSet, common: &CommonFuzzArgs) -> Vec<String> {
    if common.messages.is_empty() {
        schema
            .message_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        common.messages.clone()
    }
}

/// Summarize the selected message types.
pub fn run_list(args: &ListArgs) -> anyhow::Result<Vec<MessageSummary>> {
    let (schema, fuzzers) = load_fuzzers(&args.common)?;
    let strategy = args.common.strategy;

    selected_messages(&schema, &args.common)
        .into_iter()
        .map(|message| {
            let fuzzer = fuzzers
                .get(&message)
                .with_context(|| format!("Message type '{message}' is not in the schema"))?;
            Ok(MessageSummary {
                fields: fuzzer.fields().len(),
                dependencies: fuzzer.dependencies().len(),
                strategy,
                instances: fuzzer.count(strategy),
                message,
            })
        })
        .collect()
}

/// Generate one `<Message>.jsonl` file per selected message type.
pub fn run_generate(
    args: &JsonlGenerateArgs,
) -> anyhow::Result<Vec<(PathBuf, PopulateMetrics)>> {
    let (schema, fuzzers) = load_fuzzers(&args.common)?;

    tracing::info!(
        "Generating JSONL files ({} strategy, limit {} per message, partition {} of {})",
        args.common.strategy,
        args.limit,
        args.shard,
        args.shards
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.output_dir))?;

    let mut populator = JsonlPopulator::new(args.on_error);
    if let Some(path) = &args.recent_log {
        let log = RecentInstancesLog::open(path, args.recent_size)
            .with_context(|| format!("Failed to open recent-instances log {path:?}"))?;
        populator = populator.with_recent_log(log);
    }

    let plan = EnumerationPlan {
        strategy: args.common.strategy,
        limit: args.limit,
        shard: args.shard,
        shards: args.shards,
    };

    let mut results = Vec::new();
    for message in selected_messages(&schema, &args.common) {
        let output_path = args.output_dir.join(format!("{message}.jsonl"));
        let metrics = populator
            .populate_message(&fuzzers, &message, &output_path, &plan)
            .with_context(|| format!("Failed to generate JSONL for '{message}'"))?;

        tracing::info!(
            "Generated {:?}: {} instances ({} skipped) in {:?}",
            output_path,
            metrics.instances_written,
            metrics.instances_skipped,
            metrics.total_duration
        );
        results.push((output_path, metrics));
    }
    Ok(results)
}
