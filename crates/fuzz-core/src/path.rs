//! Dotted field paths that address fields across nested message boundaries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a dotted path string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid field path '{0}'")]
pub struct InvalidPath(pub String);

/// A dotted address of a field, e.g. `addr.house`.
///
/// Paths are relative to the message they are resolved against. A path is
/// never empty and none of its segments are empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path.
    pub fn parse(path: &str) -> Result<Self, InvalidPath> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Create a single-segment path.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment (the top-level field name).
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// The path below the first segment, if any.
    pub fn tail(&self) -> Option<FieldPath> {
        if self.segments.len() > 1 {
            Some(Self {
                segments: self.segments[1..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Prefix this path with a parent field name.
    pub fn prefixed(&self, parent: &str) -> FieldPath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(parent.to_string());
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    /// Check whether `self` equals `other` or is an ancestor of it.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Check whether two paths address the same field or one contains the other.
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = FieldPath::parse("addr.house").unwrap();
        assert_eq!(path.segments(), &["addr".to_string(), "house".to_string()]);
        assert_eq!(path.head(), "addr");
        assert_eq!(path.tail(), Some(FieldPath::field("house")));
        assert_eq!(path.to_string(), "addr.house");

        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("addr.").is_err());
        assert!(FieldPath::parse(".house").is_err());
    }

    #[test]
    fn test_overlaps() {
        let addr = FieldPath::parse("addr").unwrap();
        let house = FieldPath::parse("addr.house").unwrap();
        let foo = FieldPath::parse("foo").unwrap();
        let address = FieldPath::parse("address").unwrap();

        assert!(addr.is_prefix_of(&house));
        assert!(!house.is_prefix_of(&addr));
        assert!(addr.overlaps(&house));
        assert!(house.overlaps(&addr));
        assert!(!addr.overlaps(&foo));
        assert!(!addr.overlaps(&address));
    }

    #[test]
    fn test_prefixed() {
        let house = FieldPath::field("house").prefixed("addr");
        assert_eq!(house, FieldPath::parse("addr.house").unwrap());
    }
}
