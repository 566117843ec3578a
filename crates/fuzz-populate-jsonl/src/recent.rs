//! A crash log that keeps the most recently emitted instances on disk.
//!
//! The file is rewritten and synced on every append, so when the system
//! under test takes the process down the last inputs it received survive.
//! Entries are stored as JSON Lines.

use crate::error::JsonlPopulatorError;
use chrono::{DateTime, Utc};
use fuzz_core::ResolvedInstance;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One logged instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    /// When the instance was logged
    pub timestamp: DateTime<Utc>,

    /// Message type name
    pub message: String,

    /// The instance as a JSON object
    pub instance: serde_json::Value,
}

/// Keeps the last `size` instances in a file. A size of zero keeps all,
/// which makes every append rewrite the whole history.
#[derive(Debug)]
pub struct RecentInstancesLog {
    path: PathBuf,
    size: usize,
    entries: VecDeque<RecentEntry>,
}

impl RecentInstancesLog {
    /// Open a log, keeping the entries an earlier run left in the file.
    pub fn open<P: AsRef<Path>>(path: P, size: usize) -> Result<Self, JsonlPopulatorError> {
        let path = path.as_ref().to_path_buf();
        let mut entries: VecDeque<RecentEntry> = if path.exists() {
            Self::read(&path)?.into()
        } else {
            VecDeque::new()
        };
        if size > 0 {
            while entries.len() > size {
                entries.pop_front();
            }
        }
        Ok(Self {
            path,
            size,
            entries,
        })
    }

    /// Read every entry stored in a log file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<RecentEntry>, JsonlPopulatorError> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Log an instance and persist the log.
    pub fn append(&mut self, instance: &ResolvedInstance) -> Result<(), JsonlPopulatorError> {
        self.entries.push_back(RecentEntry {
            timestamp: Utc::now(),
            message: instance.message_type().to_string(),
            instance: instance.to_json(),
        });
        if self.size > 0 && self.entries.len() > self.size {
            self.entries.pop_front();
        }
        self.persist()
    }

    /// Entries currently kept, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RecentEntry> {
        self.entries.iter()
    }

    /// Number of entries currently kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), JsonlPopulatorError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for entry in &self.entries {
            serde_json::to_writer(&mut writer, entry)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}
