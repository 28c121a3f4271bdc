//! Path representation and parsing
//!
//! A [`Path`] identifies one location in a [`ValueTree`](crate::ValueTree):
//! an ordered list of mapping keys and sequence indexes, starting at the root.
//!
//! # Path Syntax
//!
//! - Segments are separated by `/`: `logging/handler/console`
//! - Sequence indexes are written as their own segment: `servers/[0]/host`
//! - `\` escapes `/`, `\`, `*` and `[` inside a key: `jndi/java:\/jdbc`
//! - The empty key is written `[]`
//!
//! # Examples
//!
//! ```
//! use converge_model::path::{Path, Segment};
//!
//! let path: Path = "servers/[0]/host".parse().unwrap();
//! assert_eq!(path.segments(), &[
//!     Segment::Key("servers".to_string()),
//!     Segment::Index(0),
//!     Segment::Key("host".to_string()),
//! ]);
//! assert_eq!(path.to_string(), "servers/[0]/host");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Textual form of the empty mapping key
pub(crate) const EMPTY_KEY: &str = "[]";

/// A segment of a path - either a key or a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A key in a mapping, or the name of a named value
    Key(String),
    /// An index in a sequence
    Index(usize),
}

impl Segment {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) if key.is_empty() => write!(f, "{}", EMPTY_KEY),
            Self::Key(key) => {
                for ch in key.chars() {
                    if matches!(ch, '/' | '\\' | '*' | '[') {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                Ok(())
            }
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for Segment {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// An ordered sequence of segments from the tree root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The empty path, addressing the root node
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Segment at `idx`, counting from the end when `idx` is negative
    pub fn segment(&self, idx: isize) -> Option<&Segment> {
        let resolved = if idx < 0 {
            self.0.len().checked_sub(idx.unsigned_abs())?
        } else {
            idx as usize
        };
        self.0.get(resolved)
    }

    /// A new path with `segment` appended
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// The path without its last segment, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Resolve `relative` against this path.
    ///
    /// A leading `/` makes `relative` absolute. Otherwise each `..` climbs
    /// one segment and `.` stays put.
    ///
    /// ```
    /// use converge_model::Path;
    ///
    /// let base: Path = "logging/handler/console".parse().unwrap();
    /// assert_eq!(base.resolve("../file").unwrap().to_string(), "logging/handler/file");
    /// assert_eq!(base.resolve("/logging/level").unwrap().to_string(), "logging/level");
    /// ```
    pub fn resolve(&self, relative: &str) -> Result<Self> {
        let (mut resolved, rest) = match relative.strip_prefix('/') {
            Some(rest) => (Path::root(), rest),
            None => (self.clone(), relative),
        };

        for token in split_tokens(rest)? {
            match (token.escaped, token.text.as_str()) {
                (false, ".") => {}
                (false, "..") => {
                    if resolved.pop().is_none() {
                        return Err(Error::invalid_path(relative, "climbs above the root"));
                    }
                }
                _ => resolved.push(token.into_segment()),
            }
        }

        Ok(resolved)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_path(s)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a path string into a [`Path`].
///
/// A leading `/` is accepted and ignored. The empty string is the root path.
///
/// # Examples
///
/// ```
/// use converge_model::path::{parse_path, Segment};
///
/// let path = parse_path("/datasources/pool/[2]").unwrap();
/// assert_eq!(path.segments(), &[
///     Segment::Key("datasources".to_string()),
///     Segment::Key("pool".to_string()),
///     Segment::Index(2),
/// ]);
///
/// assert!(parse_path("a//b").is_err());
/// ```
pub fn parse_path(path: &str) -> Result<Path> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments = split_tokens(trimmed)?
        .into_iter()
        .map(Token::into_segment)
        .collect();
    Ok(Path(segments))
}

/// One `/`-separated piece of a path or pattern, with escapes removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    /// True when any character of the token was escaped; such tokens are
    /// always literal keys
    pub escaped: bool,
}

impl Token {
    /// Interpret as a path segment: `[n]` is an index, `[]` the empty key,
    /// anything else a key
    pub fn into_segment(self) -> Segment {
        if !self.escaped {
            if self.text == EMPTY_KEY {
                return Segment::Key(String::new());
            }
            if let Some(idx) = parse_index(&self.text) {
                return Segment::Index(idx);
            }
        }
        Segment::Key(self.text)
    }
}

/// Parse `[n]` into `n`
pub(crate) fn parse_index(text: &str) -> Option<usize> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

pub(crate) fn split_tokens(source: &str) -> Result<Vec<Token>> {
    if source.is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut current = Token {
        text: String::new(),
        escaped: false,
    };
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) => {
                    current.text.push(next);
                    current.escaped = true;
                }
                None => return Err(Error::invalid_path(source, "dangling escape")),
            },
            '/' => {
                if current.text.is_empty() && !current.escaped {
                    return Err(Error::invalid_path(source, "empty segment"));
                }
                tokens.push(std::mem::replace(
                    &mut current,
                    Token {
                        text: String::new(),
                        escaped: false,
                    },
                ));
            }
            _ => current.text.push(ch),
        }
    }

    if current.text.is_empty() && !current.escaped {
        return Err(Error::invalid_path(source, "empty segment"));
    }
    tokens.push(current);

    Ok(tokens)
}
