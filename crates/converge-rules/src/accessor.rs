//! Access to raw rule bundles
//!
//! A bundle is a named key/value collection. [`DirRuleAccessor`] reads
//! bundles from TOML files in a rule directory:
//!
//! ```text
//! rules/
//!   rules.toml        # systems = ["logging", "datasources"]
//!   logging.toml
//!   datasources.toml
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Key/value content of one bundle
pub type Properties = toml::Table;

/// Source of rule bundles by name
pub trait RuleAccessor {
    fn load_properties(&self, name: &str) -> Result<Properties>;
}

/// Reads `<dir>/<name>.toml`
#[derive(Debug, Clone)]
pub struct DirRuleAccessor {
    dir: PathBuf,
}

impl DirRuleAccessor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", name))
    }
}

impl RuleAccessor for DirRuleAccessor {
    fn load_properties(&self, name: &str) -> Result<Properties> {
        let path = self.bundle_path(name);
        tracing::debug!("Loading rule bundle {} from {}", name, path.display());
        let content = fs::read_to_string(&path).map_err(|source| Error::BundleUnreadable {
            bundle: name.to_string(),
            path: path.clone(),
            source,
        })?;
        content
            .parse::<Properties>()
            .map_err(|e| Error::bundle(name, e.to_string()))
    }
}

/// In-memory bundles, keyed by name
impl RuleAccessor for BTreeMap<String, Properties> {
    fn load_properties(&self, name: &str) -> Result<Properties> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::bundle(name, "no such bundle"))
    }
}
