//! Leaf-path difference between desired and current state

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::PathIndex;
use crate::path::Path;
use crate::value::Scalar;

/// The kind of change a diff describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Remove,
    Replace,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// A single delta between desired and current state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Diff {
    /// Present in desired, absent from current
    Add { path: Path, new: Scalar },
    /// Present in current, absent from desired
    Remove { path: Path, old: Scalar },
    /// Present in both with different values
    Replace { path: Path, old: Scalar, new: Scalar },
}

impl Diff {
    pub fn action(&self) -> Action {
        match self {
            Self::Add { .. } => Action::Add,
            Self::Remove { .. } => Action::Remove,
            Self::Replace { .. } => Action::Replace,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Add { path, .. } | Self::Remove { path, .. } | Self::Replace { path, .. } => path,
        }
    }

    pub fn old_value(&self) -> Option<&Scalar> {
        match self {
            Self::Remove { old, .. } | Self::Replace { old, .. } => Some(old),
            Self::Add { .. } => None,
        }
    }

    pub fn new_value(&self) -> Option<&Scalar> {
        match self {
            Self::Add { new, .. } | Self::Replace { new, .. } => Some(new),
            Self::Remove { .. } => None,
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { path, new } => write!(f, "add {} = {}", path, new),
            Self::Remove { path, old } => write!(f, "remove {} (was {})", path, old),
            Self::Replace { path, old, new } => {
                write!(f, "replace {}: {} -> {}", path, old, new)
            }
        }
    }
}

/// Compute the ordered differences that take `current` to `desired`.
///
/// Add and Replace diffs come first, in the visit order of the desired
/// index (ancestors before descendants). Remove diffs follow in the visit
/// order of the current index. Only leaves are indexed and a leaf has no
/// descendants, so that order already puts every removed leaf ahead of any
/// container it empties.
///
/// ```
/// use converge_model::{Diff, PathIndex, ValueTree, compute_difference};
/// use serde_json::json;
///
/// let desired = PathIndex::from_tree(&ValueTree::from_json(json!({"sub": {"a": "2"}})));
/// let current = PathIndex::from_tree(&ValueTree::from_json(json!({"sub": {"a": "1", "b": "x"}})));
/// let diffs = compute_difference(&desired, &current);
/// assert_eq!(diffs.len(), 2);
/// assert!(matches!(diffs[0], Diff::Replace { .. }));
/// assert!(matches!(diffs[1], Diff::Remove { .. }));
/// ```
pub fn compute_difference(desired: &PathIndex, current: &PathIndex) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for (path, new) in desired {
        match current.get(path) {
            None => diffs.push(Diff::Add {
                path: path.clone(),
                new: new.clone(),
            }),
            Some(old) if old != new => diffs.push(Diff::Replace {
                path: path.clone(),
                old: old.clone(),
                new: new.clone(),
            }),
            Some(_) => {}
        }
    }

    for (path, old) in current {
        if !desired.contains(path) {
            diffs.push(Diff::Remove {
                path: path.clone(),
                old: old.clone(),
            });
        }
    }

    diffs
}
