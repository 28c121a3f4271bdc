//! Preprocessing transforms
//!
//! Desired input and live query output rarely share one representation.
//! Transforms normalise a tree before it is indexed, so diffing compares
//! equivalent shapes. Every transform is a pure tree-to-tree function.

use serde::{Deserialize, Serialize};

use converge_model::{Mapping, Path, PathPattern, ValueTree};

/// One preprocessing step, as declared in a rule bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum Transform {
    /// Rename every mapping key whose path matches `pattern`.
    /// A key is left alone when `to` already exists in its mapping.
    Rename { pattern: PathPattern, to: String },
    /// Remove every node whose path matches `pattern`
    Drop { pattern: PathPattern },
    /// Insert `value` at `path` when nothing is defined there
    Default {
        path: Path,
        value: serde_json::Value,
    },
}

impl Transform {
    pub fn apply(&self, tree: &ValueTree) -> ValueTree {
        match self {
            Self::Rename { pattern, to } => rename(tree, &mut Path::root(), pattern, to),
            Self::Drop { pattern } => {
                if pattern.matches(&Path::root()) {
                    return ValueTree::undefined();
                }
                drop_matching(tree, &mut Path::root(), pattern)
            }
            Self::Default { path, value } => {
                let defined = tree.get(path).is_some_and(|node| !node.is_undefined());
                if defined {
                    return tree.clone();
                }
                let mut out = tree.clone();
                if let Err(e) = out.set(path, ValueTree::from_json(value.clone())) {
                    tracing::warn!("Skipping default for {}: {}", path, e);
                    return tree.clone();
                }
                out
            }
        }
    }
}

/// Apply `transforms` in order
pub fn apply_all(transforms: &[Transform], tree: &ValueTree) -> ValueTree {
    transforms
        .iter()
        .fold(tree.clone(), |acc, transform| transform.apply(&acc))
}

fn rename(node: &ValueTree, path: &mut Path, pattern: &PathPattern, to: &str) -> ValueTree {
    match node {
        ValueTree::Scalar(_) => node.clone(),
        ValueTree::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                path.push(idx);
                out.push(rename(item, path, pattern, to));
                path.pop();
            }
            ValueTree::Sequence(out)
        }
        ValueTree::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                path.push(key.as_str());
                let new_key = if key != to && pattern.matches(path) {
                    if map.contains_key(to) || out.contains_key(to) {
                        tracing::warn!("Not renaming {} to {}: the key is already taken", path, to);
                        key.clone()
                    } else {
                        to.to_string()
                    }
                } else {
                    key.clone()
                };
                out.insert(new_key, rename(value, path, pattern, to));
                path.pop();
            }
            ValueTree::Mapping(out)
        }
        ValueTree::NamedValue { name, value } => {
            path.push(name.as_str());
            let renamed = rename(value, path, pattern, to);
            path.pop();
            ValueTree::named(name.clone(), renamed)
        }
    }
}

fn drop_matching(node: &ValueTree, path: &mut Path, pattern: &PathPattern) -> ValueTree {
    match node {
        ValueTree::Scalar(_) => node.clone(),
        ValueTree::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                path.push(idx);
                if !pattern.matches(path) {
                    out.push(drop_matching(item, path, pattern));
                }
                path.pop();
            }
            ValueTree::Sequence(out)
        }
        ValueTree::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                path.push(key.as_str());
                if !pattern.matches(path) {
                    out.insert(key.clone(), drop_matching(value, path, pattern));
                }
                path.pop();
            }
            ValueTree::Mapping(out)
        }
        ValueTree::NamedValue { name, value } => {
            path.push(name.as_str());
            let inner = if pattern.matches(path) {
                ValueTree::undefined()
            } else {
                drop_matching(value, path, pattern)
            };
            path.pop();
            ValueTree::named(name.clone(), inner)
        }
    }
}
