//! Loading desired-state documents
//!
//! An input document is a JSON or YAML object keyed by system name:
//!
//! ```text
//! {
//!   "logging": { "level": "INFO" },
//!   "datasources": { ... }
//! }
//! ```

use std::fs;
use std::path::Path as FsPath;

use crate::error::{Error, Result};
use crate::value::ValueTree;

/// Supported document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Choose a format from a file extension; anything unrecognised is JSON
    pub fn from_path(path: &FsPath) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A parsed desired-state document
#[derive(Debug, Clone, PartialEq)]
pub struct InputDocument {
    /// Where the document came from, for diagnostics
    pub source: String,
    /// Mapping-rooted content
    pub tree: ValueTree,
}

impl InputDocument {
    pub fn new(source: impl Into<String>, tree: ValueTree) -> Result<Self> {
        let source = source.into();
        if tree.as_mapping().is_none() {
            return Err(Error::NotAnObject {
                source_name: source,
                found: tree.kind().to_string(),
            });
        }
        Ok(Self { source, tree })
    }

    /// Top-level keys, i.e. the system names this document configures
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.tree
            .as_mapping()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// True when the document has a defined entry for `system`
    pub fn defines(&self, system: &str) -> bool {
        self.tree
            .get_key(system)
            .is_some_and(|node| !node.is_undefined())
    }
}

/// Parse document text in the given format
pub fn parse_document(source: &str, text: &str, format: DocumentFormat) -> Result<InputDocument> {
    let tree = match format {
        DocumentFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|e| Error::parse(source, e.to_string()))?;
            ValueTree::from_json(value)
        }
        DocumentFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| Error::parse(source, e.to_string()))?;
            ValueTree::from_yaml(value).map_err(|message| Error::parse(source, message))?
        }
    };
    InputDocument::new(source, tree)
}

/// Read and parse a document from disk
pub fn load_document(path: &FsPath) -> Result<InputDocument> {
    tracing::debug!("Opening {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(
        &path.display().to_string(),
        &text,
        DocumentFormat::from_path(path),
    )
}
