//! The default value source: boundary integers, interesting floats and a
//! list of attack strings.
//!
//! The built-in corpus is embedded. A fuzzdb-style directory can be loaded
//! instead with [`CorpusValueSource::from_dir`]:
//!
//! ```text
//! corpus/
//!   integer-overflow/*.txt   one integer per line (decimal, 0x, 0o, 0b)
//!   <any other dir>/*.txt    one string per line
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Directories and
//! files are read in sorted order.

use super::ValueSource;
use crate::conformance::integer_value;
use crate::error::CorpusError;
use fuzz_core::{FuzzValue, ScalarKind};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const INTEGER_DIR: &str = "integer-overflow";

const INTEGERS: [i128; 12] = [
    -1,
    0,
    0x100,
    0x1000,
    0x3fff_ffff,
    0x7fff_fffe,
    0x7fff_ffff,
    0x8000_0000,
    0xffff_fffe,
    0xffff_ffff,
    0x10000,
    0x100000,
];

const FLOATS: [f64; 5] = [0.0, -1.0, 1.0, -1231231231231.0123, 123123123123123.123];

const STRINGS: &[&str] = &[
    "!",
    "'",
    "\"",
    "%s%s%s%s%s%s%s%s%s%s",
    "%n%n%n%n%n%n%n%n%n%n",
    "%x%x%x%x",
    "../../../../../../etc/passwd",
    "..\\..\\..\\..\\..\\..\\boot.ini",
    "' OR '1'='1",
    "1; DROP TABLE users--",
    "<script>alert(1)</script>",
    "\"><img src=x onerror=alert(1)>",
    "${jndi:ldap://127.0.0.1/a}",
    "{{7*7}}",
    "$(id)",
    "`id`",
    "|id",
    "\u{0}",
    "\u{202e}",
    "\u{feff}",
    "\u{1F600}",
];

/// Options applied to the string candidates of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusOptions {
    /// Drop strings longer than this many bytes
    pub max_string_len: Option<usize>,

    /// Keep at most this many strings
    pub string_limit: Option<usize>,
}

/// Value source backed by a boundary-value corpus.
#[derive(Debug, Clone)]
pub struct CorpusValueSource {
    integers: Vec<i128>,
    strings: Vec<String>,
    options: CorpusOptions,
}

impl Default for CorpusValueSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusValueSource {
    /// Create a source from the embedded corpus.
    pub fn new() -> Self {
        let mut strings: Vec<String> = STRINGS.iter().map(|s| s.to_string()).collect();
        strings.push("A".repeat(256));
        strings.push("A".repeat(4096));
        Self {
            integers: INTEGERS.to_vec(),
            strings,
            options: CorpusOptions::default(),
        }
    }

    /// Create a source from explicit integer and string lists.
    pub fn from_parts(integers: Vec<i128>, strings: Vec<String>) -> Self {
        Self {
            integers,
            strings,
            options: CorpusOptions::default(),
        }
    }

    /// Load a fuzzdb-style corpus directory.
    pub fn from_dir<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let root = path.as_ref();
        let mut integers = Vec::new();
        let mut strings = Vec::new();

        for dir in sorted_entries(root)? {
            if !dir.is_dir() {
                continue;
            }
            let is_integers = dir.file_name().is_some_and(|name| name == INTEGER_DIR);
            for file in sorted_entries(&dir)? {
                if file.extension().map_or(true, |ext| ext != "txt") {
                    continue;
                }
                let content = fs::read_to_string(&file).map_err(|source| CorpusError::Io {
                    path: file.clone(),
                    source,
                })?;
                if is_integers {
                    integers.extend(parse_integers(&file, &content)?);
                } else {
                    strings.extend(corpus_lines(&content).map(|(_, line)| line.to_string()));
                }
            }
        }

        debug!(
            "Loaded corpus from {}: {} integers, {} strings",
            root.display(),
            integers.len(),
            strings.len()
        );
        Ok(Self::from_parts(integers, strings))
    }

    /// Apply string options.
    pub fn with_options(mut self, options: CorpusOptions) -> Self {
        self.options = options;
        self
    }

    /// The raw integer list, before width filtering.
    pub fn integers(&self) -> &[i128] {
        &self.integers
    }

    /// The string list after options are applied.
    pub fn strings(&self) -> Vec<&str> {
        let max_len = self.options.max_string_len;
        let limit = self.options.string_limit.unwrap_or(usize::MAX);
        self.strings
            .iter()
            .map(String::as_str)
            .filter(|s| max_len.map_or(true, |max| s.len() <= max))
            .take(limit)
            .collect()
    }
}

impl ValueSource for CorpusValueSource {
    fn values_for(&self, kind: ScalarKind) -> Vec<FuzzValue> {
        match kind {
            ScalarKind::Bool => vec![FuzzValue::Bool(true), FuzzValue::Bool(false)],
            ScalarKind::Float => FLOATS
                .iter()
                .filter(|f| (**f as f32).is_finite())
                .map(|f| FuzzValue::Float(*f))
                .collect(),
            ScalarKind::Double => FLOATS.iter().map(|f| FuzzValue::Float(*f)).collect(),
            ScalarKind::String => self
                .strings()
                .into_iter()
                .map(|s| FuzzValue::String(s.to_string()))
                .collect(),
            ScalarKind::Bytes => self
                .strings()
                .into_iter()
                .map(|s| FuzzValue::Bytes(s.as_bytes().to_vec()))
                .collect(),
            _ => self
                .integers
                .iter()
                .filter_map(|i| integer_value(kind, *i))
                .collect(),
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        entries.push(entry.map_err(io_err)?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Non-blank, non-comment lines with their 1-based line numbers.
fn corpus_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_integers(path: &Path, content: &str) -> Result<Vec<i128>, CorpusError> {
    corpus_lines(content)
        .map(|(line, value)| {
            parse_integer(value).ok_or_else(|| CorpusError::InvalidInteger {
                path: path.to_path_buf(),
                line,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Parse an integer literal with optional sign and radix prefix.
pub fn parse_integer(text: &str) -> Option<i128> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = rest.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        (10, lower.as_str())
    };
    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
