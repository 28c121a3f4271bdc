//! The hierarchical value model
//!
//! [`ValueTree`] represents both desired configuration and live state. It is a
//! closed set of node kinds: scalar leaves, ordered sequences, insertion-ordered
//! mappings, and named values (a single name/value pairing that carries its own
//! identity, like a property node of the managed model).

use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::path::{Path, Segment};

/// Keys are unique, insertion order is preserved, equality ignores order
pub type Mapping = IndexMap<String, ValueTree>;

/// A leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
    /// An attribute with no value (JSON `null`)
    Undefined,
}

impl Scalar {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Undefined => Value::Null,
        }
    }

    /// Interpret `text` as a JSON scalar, falling back to a plain string
    pub fn parse_lenient(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Number(n)) => Self::Number(n),
            Ok(Value::Bool(b)) => Self::Bool(b),
            Ok(Value::Null) => Self::Undefined,
            Ok(Value::String(s)) => Self::String(s),
            _ => Self::String(text.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => n.serialize(serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// A node of the value model
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTree {
    Scalar(Scalar),
    Sequence(Vec<ValueTree>),
    Mapping(Mapping),
    NamedValue { name: String, value: Box<ValueTree> },
}

impl ValueTree {
    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn undefined() -> Self {
        Self::Scalar(Scalar::Undefined)
    }

    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    pub fn named(name: impl Into<String>, value: ValueTree) -> Self {
        Self::NamedValue {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// Short name of the node kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(Scalar::Undefined) => "undefined",
            Self::Scalar(_) => "scalar",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::NamedValue { .. } => "named value",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Undefined))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key of a mapping node
    pub fn get_key(&self, key: &str) -> Option<&ValueTree> {
        self.as_mapping()?.get(key)
    }

    /// Extract the sub-tree for one top-level key, keeping the key as root.
    ///
    /// Returns `None` when the key is absent or undefined.
    ///
    /// ```
    /// use converge_model::ValueTree;
    /// use serde_json::json;
    ///
    /// let doc = ValueTree::from_json(json!({"logging": {"level": "INFO"}, "web": {}}));
    /// let logging = doc.subtree("logging").unwrap();
    /// assert_eq!(logging.to_json(), json!({"logging": {"level": "INFO"}}));
    /// assert!(doc.subtree("missing").is_none());
    /// ```
    pub fn subtree(&self, key: &str) -> Option<ValueTree> {
        let child = self.get_key(key)?;
        if child.is_undefined() {
            return None;
        }
        let mut root = Mapping::new();
        root.insert(key.to_string(), child.clone());
        Some(Self::Mapping(root))
    }

    fn child(&self, segment: &Segment) -> Option<&ValueTree> {
        match (self, segment) {
            (Self::Mapping(map), Segment::Key(key)) => map.get(key),
            (Self::NamedValue { name, value }, Segment::Key(key)) if name == key => Some(value),
            (Self::Sequence(items), Segment::Index(idx)) => items.get(*idx),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut ValueTree> {
        match (self, segment) {
            (Self::Mapping(map), Segment::Key(key)) => map.get_mut(key),
            (Self::NamedValue { name, value }, Segment::Key(key)) if name == key => Some(value),
            (Self::Sequence(items), Segment::Index(idx)) => items.get_mut(*idx),
            _ => None,
        }
    }

    /// Get the node at `path`, or `None` if it doesn't exist
    pub fn get(&self, path: &Path) -> Option<&ValueTree> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Set the node at `path`, creating intermediate containers as needed.
    ///
    /// A missing mapping key is inserted at the end of the mapping. A sequence
    /// index may address an existing element or the slot one past the end.
    /// Undefined scalars along the way are replaced by containers.
    ///
    /// ```
    /// use converge_model::{Path, ValueTree};
    /// use serde_json::json;
    ///
    /// let mut tree = ValueTree::empty_mapping();
    /// let path: Path = "logging/handlers/[0]/name".parse().unwrap();
    /// tree.set(&path, ValueTree::string("console")).unwrap();
    /// assert_eq!(tree.to_json(), json!({"logging": {"handlers": [{"name": "console"}]}}));
    /// ```
    pub fn set(&mut self, path: &Path, new_value: ValueTree) -> Result<()> {
        self.set_at(path.segments(), new_value)
            .map_err(|reason| Error::PathSetFailed {
                path: path.to_string(),
                reason,
            })
    }

    fn set_at(&mut self, segments: &[Segment], new_value: ValueTree) -> std::result::Result<(), String> {
        let Some((first, rest)) = segments.split_first() else {
            *self = new_value;
            return Ok(());
        };

        if self.is_undefined() {
            *self = match first {
                Segment::Key(_) => Self::empty_mapping(),
                Segment::Index(_) => Self::Sequence(Vec::new()),
            };
        }

        match (&mut *self, first) {
            (Self::Mapping(map), Segment::Key(key)) => {
                let slot = map.entry(key.clone()).or_insert_with(Self::undefined);
                slot.set_at(rest, new_value)
            }
            (Self::NamedValue { name, value }, Segment::Key(key)) if name == key => {
                value.set_at(rest, new_value)
            }
            (Self::Sequence(items), Segment::Index(idx)) => {
                if *idx == items.len() {
                    items.push(Self::undefined());
                }
                match items.get_mut(*idx) {
                    Some(item) => item.set_at(rest, new_value),
                    None => Err(format!(
                        "index {} is beyond the end of a sequence of {}",
                        idx,
                        items.len()
                    )),
                }
            }
            (node, segment) => Err(format!("cannot address {} inside a {}", segment, node.kind())),
        }
    }

    /// Remove the node at `path`, returning it if it existed
    ///
    /// Removing a sequence element shifts later elements down.
    pub fn remove(&mut self, path: &Path) -> Option<ValueTree> {
        let (last, parents) = path.segments().split_last()?;

        let parent = parents
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))?;

        match (parent, last) {
            (Self::Mapping(map), Segment::Key(key)) => map.shift_remove(key),
            (Self::Sequence(items), Segment::Index(idx)) if *idx < items.len() => {
                Some(items.remove(*idx))
            }
            (Self::NamedValue { name, value }, Segment::Key(key)) if name == key => {
                Some(std::mem::replace(&mut **value, Self::undefined()))
            }
            _ => None,
        }
    }

    /// Depth-first, pre-order iterator over `(path, leaf)` pairs
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![(Path::root(), self)],
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Undefined),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON; a named value becomes a single-key object
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => s.to_json(),
            Self::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Mapping(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::NamedValue { name, value } => {
                let mut obj = serde_json::Map::new();
                obj.insert(name.clone(), value.to_json());
                Value::Object(obj)
            }
        }
    }

    /// Convert a YAML value. A mapping tagged `!named` with exactly one entry
    /// becomes a [`ValueTree::NamedValue`].
    pub fn from_yaml(value: serde_yaml::Value) -> std::result::Result<Self, String> {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Ok(Self::Scalar(Scalar::Undefined)),
            Yaml::Bool(b) => Ok(Self::Scalar(Scalar::Bool(b))),
            Yaml::Number(n) => yaml_number(&n).map(Self::Scalar),
            Yaml::String(s) => Ok(Self::Scalar(Scalar::String(s))),
            Yaml::Sequence(items) => items
                .into_iter()
                .map(Self::from_yaml)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Self::Sequence),
            Yaml::Mapping(map) => {
                let mut out = Mapping::new();
                for (k, v) in map {
                    out.insert(yaml_key(k)?, Self::from_yaml(v)?);
                }
                Ok(Self::Mapping(out))
            }
            Yaml::Tagged(tagged) => {
                if tagged.tag != "named" {
                    return Err(format!("unsupported tag {}", tagged.tag));
                }
                match Self::from_yaml(tagged.value)? {
                    Self::Mapping(map) if map.len() == 1 => {
                        let (name, value) = map
                            .into_iter()
                            .next()
                            .ok_or_else(|| "empty !named mapping".to_string())?;
                        Ok(Self::named(name, value))
                    }
                    other => Err(format!(
                        "!named expects a mapping with one entry, found a {}",
                        other.kind()
                    )),
                }
            }
        }
    }

    /// Indented multi-line dump of the tree structure, for debug logging
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, indent: usize, out: &mut String) {
        let pad = "  ".repeat(indent);
        match self {
            Self::Scalar(s) => {
                let _ = writeln!(out, "{}{:?}", pad, s);
            }
            Self::Sequence(items) => {
                let _ = writeln!(out, "{}LIST:", pad);
                for item in items {
                    item.write_outline(indent + 1, out);
                }
            }
            Self::Mapping(map) => {
                let _ = writeln!(out, "{}OBJECT:", pad);
                for (key, value) in map {
                    let _ = writeln!(out, "{}  Key:{}", pad, key);
                    value.write_outline(indent + 1, out);
                }
            }
            Self::NamedValue { name, value } => {
                let _ = writeln!(out, "{}PROPERTY:{}", pad, name);
                value.write_outline(indent + 1, out);
            }
        }
    }
}

impl From<Scalar> for ValueTree {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl fmt::Display for ValueTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for ValueTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn yaml_number(n: &serde_yaml::Number) -> std::result::Result<Scalar, String> {
    if let Some(i) = n.as_i64() {
        return Ok(Scalar::Number(i.into()));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Scalar::Number(u.into()));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .map(Scalar::Number)
        .ok_or_else(|| format!("number {} has no JSON representation", n))
}

fn yaml_key(key: serde_yaml::Value) -> std::result::Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(format!("unsupported mapping key {:?}", other)),
    }
}

/// Iterator returned by [`ValueTree::leaves`]
///
/// Uses an explicit stack so input depth is bounded only by memory.
pub struct Leaves<'a> {
    stack: Vec<(Path, &'a ValueTree)>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Path, &'a Scalar);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            match node {
                ValueTree::Scalar(s) => return Some((path, s)),
                ValueTree::Sequence(items) => {
                    for (idx, item) in items.iter().enumerate().rev() {
                        self.stack.push((path.child(idx), item));
                    }
                }
                ValueTree::Mapping(map) => {
                    for (key, value) in map.iter().rev() {
                        self.stack.push((path.child(key.as_str()), value));
                    }
                }
                ValueTree::NamedValue { name, value } => {
                    self.stack.push((path.child(name.as_str()), value));
                }
            }
        }
        None
    }
}
