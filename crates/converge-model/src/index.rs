//! Flattened leaf index of a value tree
//!
//! A [`PathIndex`] holds exactly one entry per leaf of a [`ValueTree`],
//! keyed by the full path from the root, in depth-first visit order.
//! Container nodes are not indexed.

use indexmap::IndexMap;

use crate::diff::Diff;
use crate::path::{Path, Segment};
use crate::value::{Mapping, Scalar, ValueTree};

/// Ordered mapping from leaf path to leaf value
///
/// Equality is set-like: two indexes are equal when they hold the same
/// `(path, value)` pairs, in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathIndex {
    entries: IndexMap<Path, Scalar>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every leaf of `tree`
    pub fn from_tree(tree: &ValueTree) -> Self {
        let entries = tree
            .leaves()
            .map(|(path, leaf)| (path, leaf.clone()))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&Scalar> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Entries in visit order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Scalar)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys()
    }

    /// Insert or overwrite one leaf; new paths go to the end
    pub fn insert(&mut self, path: Path, value: Scalar) -> Option<Scalar> {
        self.entries.insert(path, value)
    }

    pub fn remove(&mut self, path: &Path) -> Option<Scalar> {
        self.entries.shift_remove(path)
    }

    /// Apply one diff as if the remediation it describes had succeeded
    pub fn apply(&mut self, diff: &Diff) {
        match diff {
            Diff::Add { path, new } | Diff::Replace { path, new, .. } => {
                self.insert(path.clone(), new.clone());
            }
            Diff::Remove { path, .. } => {
                self.remove(path);
            }
        }
    }

    /// Rebuild a tree from the indexed leaves.
    ///
    /// Key segments become mappings and index segments become sequences.
    /// Sequence elements are placed in ascending index order, so gaps left by
    /// removed elements close up. Empty containers and named values of the
    /// source tree are not recoverable from leaves.
    pub fn to_tree(&self) -> ValueTree {
        let mut root = Node::default();
        for (path, leaf) in &self.entries {
            root.insert(path.segments(), leaf.clone());
        }
        root.into_tree()
    }
}

impl FromIterator<(Path, Scalar)> for PathIndex {
    fn from_iter<I: IntoIterator<Item = (Path, Scalar)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PathIndex {
    type Item = (&'a Path, &'a Scalar);
    type IntoIter = indexmap::map::Iter<'a, Path, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Scratch structure for [`PathIndex::to_tree`]
#[derive(Default)]
struct Node {
    leaf: Option<Scalar>,
    keys: IndexMap<String, Node>,
    indexes: std::collections::BTreeMap<usize, Node>,
}

impl Node {
    fn insert(&mut self, segments: &[Segment], leaf: Scalar) {
        match segments.split_first() {
            None => self.leaf = Some(leaf),
            Some((Segment::Key(key), rest)) => {
                self.keys.entry(key.clone()).or_default().insert(rest, leaf)
            }
            Some((Segment::Index(idx), rest)) => {
                self.indexes.entry(*idx).or_default().insert(rest, leaf)
            }
        }
    }

    fn into_tree(self) -> ValueTree {
        if let Some(leaf) = self.leaf {
            return ValueTree::Scalar(leaf);
        }
        if !self.indexes.is_empty() {
            return ValueTree::Sequence(self.indexes.into_values().map(Node::into_tree).collect());
        }
        let map: Mapping = self
            .keys
            .into_iter()
            .map(|(k, v)| (k, v.into_tree()))
            .collect();
        ValueTree::Mapping(map)
    }
}
