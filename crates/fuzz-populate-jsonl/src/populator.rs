//! Writes enumerated instances as JSON Lines.

use crate::error::JsonlPopulatorError;
use crate::recent::RecentInstancesLog;
use clap::ValueEnum;
use fuzz_core::ResolvedInstance;
use fuzz_generator::{MessageFuzzer, Strategy, TypeConformanceError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default buffer size for JSONL writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// What to do with an instance that fails type conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorPolicy {
    /// Log and count the failure, continue with the next instance
    #[default]
    Skip,

    /// Stop writing and return the failure
    Abort,
}

/// Which part of a message's enumeration to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationPlan {
    /// Combination strategy
    pub strategy: Strategy,
    /// Maximum instances (0 = unlimited)
    pub limit: u64,
    /// Partition index
    pub shard: usize,
    /// Total number of partitions
    pub shards: usize,
}

impl Default for EnumerationPlan {
    fn default() -> Self {
        Self {
            strategy: Strategy::Permute,
            limit: 0,
            shard: 0,
            shards: 1,
        }
    }
}

/// Metrics from a populate operation.
#[derive(Debug, Clone, Default)]
pub struct PopulateMetrics {
    /// Number of instances written.
    pub instances_written: u64,
    /// Number of non-conforming instances skipped.
    pub instances_skipped: u64,
    /// Total time taken.
    pub total_duration: Duration,
    /// Time spent enumerating instances.
    pub generation_duration: Duration,
    /// Time spent writing instances.
    pub write_duration: Duration,
    /// Output file size in bytes.
    pub file_size_bytes: u64,
}

impl PopulateMetrics {
    /// Calculate instances per second.
    pub fn instances_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.instances_written as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.file_size_bytes as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Writes the instances of a message fuzzer to a JSONL file.
#[derive(Debug, Default)]
pub struct JsonlPopulator {
    policy: ErrorPolicy,
    recent: Option<RecentInstancesLog>,
}

impl JsonlPopulator {
    /// Create a populator with the given error policy.
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            recent: None,
        }
    }

    /// Also record every written instance in a recent-instances log.
    pub fn with_recent_log(mut self, log: RecentInstancesLog) -> Self {
        self.recent = Some(log);
        self
    }

    /// The error policy.
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The recent-instances log, if any.
    pub fn recent_log(&self) -> Option<&RecentInstancesLog> {
        self.recent.as_ref()
    }

    /// Enumerate `fuzzer` according to `plan` and write one JSON object per
    /// instance to `output_path`.
    pub fn populate<P: AsRef<Path>>(
        &mut self,
        fuzzer: &MessageFuzzer,
        output_path: P,
        plan: &EnumerationPlan,
    ) -> Result<PopulateMetrics, JsonlPopulatorError> {
        let instances = fuzzer
            .enumerate(plan.strategy)
            .with_limit(plan.limit)
            .partition(plan.shard, plan.shards)?;

        let output_path = output_path.as_ref();
        info!(
            "Generating JSONL file '{}' for message '{}' ({} strategy, partition {} of {})",
            output_path.display(),
            fuzzer.name(),
            plan.strategy,
            plan.shard,
            plan.shards
        );
        self.write_instances(fuzzer.name(), instances, output_path)
    }

    /// Look up `message` in a fuzzer set and populate it.
    pub fn populate_message<P: AsRef<Path>>(
        &mut self,
        fuzzers: &BTreeMap<String, MessageFuzzer>,
        message: &str,
        output_path: P,
        plan: &EnumerationPlan,
    ) -> Result<PopulateMetrics, JsonlPopulatorError> {
        let fuzzer = fuzzers
            .get(message)
            .ok_or_else(|| JsonlPopulatorError::MessageNotFound(message.to_string()))?;
        self.populate(fuzzer, output_path, plan)
    }

    /// Write a stream of instances to `output_path`, applying the error
    /// policy to non-conforming ones.
    pub fn write_instances<I, P>(
        &mut self,
        message: &str,
        instances: I,
        output_path: P,
    ) -> Result<PopulateMetrics, JsonlPopulatorError>
    where
        I: IntoIterator<Item = Result<ResolvedInstance, TypeConformanceError>>,
        P: AsRef<Path>,
    {
        let start_time = Instant::now();
        let mut metrics = PopulateMetrics::default();
        let output_path = output_path.as_ref();

        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

        let mut generation_time = Duration::ZERO;
        let mut write_time = Duration::ZERO;
        let mut instances = instances.into_iter();

        loop {
            let gen_start = Instant::now();
            let Some(item) = instances.next() else {
                break;
            };
            generation_time += gen_start.elapsed();

            let instance = match item {
                Ok(instance) => instance,
                Err(e) => match self.policy {
                    ErrorPolicy::Skip => {
                        metrics.instances_skipped += 1;
                        debug!("Skipping non-conforming instance: {}", e);
                        continue;
                    }
                    ErrorPolicy::Abort => {
                        writer.flush()?;
                        return Err(e.into());
                    }
                },
            };

            let write_start = Instant::now();
            serde_json::to_writer(&mut writer, &instance.to_json())?;
            writeln!(writer)?;
            if let Some(recent) = self.recent.as_mut() {
                recent.append(&instance)?;
            }
            write_time += write_start.elapsed();

            metrics.instances_written += 1;

            if metrics.instances_written % 10000 == 0 {
                debug!("Written {} instances", metrics.instances_written);
            }
        }

        writer.flush()?;
        drop(writer);

        metrics.file_size_bytes = std::fs::metadata(output_path)?.len();
        metrics.total_duration = start_time.elapsed();
        metrics.generation_duration = generation_time;
        metrics.write_duration = write_time;

        if metrics.instances_skipped > 0 {
            warn!(
                "Skipped {} non-conforming instances of '{}'",
                metrics.instances_skipped, message
            );
        }
        info!(
            "JSONL generation complete for '{}': {} instances, {} bytes in {:?} ({:.2} instances/sec)",
            message,
            metrics.instances_written,
            metrics.file_size_bytes,
            metrics.total_duration,
            metrics.instances_per_second()
        );

        Ok(metrics)
    }
}
