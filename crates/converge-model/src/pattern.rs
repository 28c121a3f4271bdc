//! Declarative path patterns
//!
//! A [`PathPattern`] is matched against a concrete [`Path`] as a whole; there
//! are no prefix matches.
//!
//! # Pattern Syntax
//!
//! - `name` or `[3]` - literal key or literal index
//! - `*` - any single segment, key or index
//! - `[*]` - any single index segment
//! - `**` - zero or more segments; at most one per pattern
//!
//! ```
//! use converge_model::{Path, PathPattern};
//!
//! let pattern = PathPattern::compile("logging/**/level").unwrap();
//! let path: Path = "logging/handler/console/level".parse().unwrap();
//! assert!(pattern.matches(&path));
//! assert!(pattern.matches(&"logging/level".parse().unwrap()));
//! assert!(!pattern.matches(&"logging/level/extra".parse().unwrap()));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::path::{EMPTY_KEY, Path, Segment, parse_index, split_tokens};

/// One element of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    Key(String),
    Index(usize),
    /// `*`
    AnySegment,
    /// `[*]`
    AnyIndex,
    /// `**`
    AnyDepth,
}

impl PatternSegment {
    fn matches(&self, segment: &Segment) -> bool {
        match (self, segment) {
            (Self::Key(expected), Segment::Key(actual)) => expected == actual,
            (Self::Index(expected), Segment::Index(actual)) => expected == actual,
            (Self::AnySegment, _) => true,
            (Self::AnyIndex, Segment::Index(_)) => true,
            _ => false,
        }
    }
}

/// A compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
    /// Position of the `**` segment, if any
    any_depth: Option<usize>,
}

impl PathPattern {
    /// Compile a pattern string.
    ///
    /// Fails when the pattern has empty segments, a dangling escape, or more
    /// than one `**`.
    pub fn compile(pattern: &str) -> Result<Self> {
        let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
        let tokens = split_tokens(trimmed)
            .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;

        let mut segments = Vec::with_capacity(tokens.len());
        let mut any_depth = None;

        for token in tokens {
            let segment = if token.escaped {
                PatternSegment::Key(token.text)
            } else {
                match token.text.as_str() {
                    "*" => PatternSegment::AnySegment,
                    "[*]" => PatternSegment::AnyIndex,
                    EMPTY_KEY => PatternSegment::Key(String::new()),
                    "**" => {
                        if any_depth.is_some() {
                            return Err(Error::invalid_pattern(
                                pattern,
                                "only one '**' is allowed",
                            ));
                        }
                        any_depth = Some(segments.len());
                        PatternSegment::AnyDepth
                    }
                    text => match parse_index(text) {
                        Some(idx) => PatternSegment::Index(idx),
                        None => PatternSegment::Key(text.to_string()),
                    },
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            any_depth,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// True when the pattern has no wildcards of any kind
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, PatternSegment::Key(_) | PatternSegment::Index(_)))
    }

    /// Test whether the whole of `path` matches this pattern
    pub fn matches(&self, path: &Path) -> bool {
        let actual = path.segments();

        let Some(pos) = self.any_depth else {
            return actual.len() == self.segments.len() && all_match(&self.segments, actual);
        };

        let prefix = &self.segments[..pos];
        let suffix = &self.segments[pos + 1..];
        if actual.len() < prefix.len() + suffix.len() {
            return false;
        }

        all_match(prefix, &actual[..prefix.len()])
            && all_match(suffix, &actual[actual.len() - suffix.len()..])
    }
}

fn all_match(pattern: &[PatternSegment], actual: &[Segment]) -> bool {
    pattern.iter().zip(actual).all(|(p, s)| p.matches(s))
}

/// Compile `pattern` and test it against `path` in one step
pub fn matches(pattern: &str, path: &Path) -> Result<bool> {
    Ok(PathPattern::compile(pattern)?.matches(path))
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for PathPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::compile(&text).map_err(serde::de::Error::custom)
    }
}
