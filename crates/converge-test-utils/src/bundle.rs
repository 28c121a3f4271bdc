//! [`BundleWriter`]: rule bundles in a temporary directory.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Writes a root `rules.toml` plus one bundle per system.
///
/// Systems are listed in the root bundle in the order they are added.
///
/// # Example
///
/// ```rust
/// use converge_rules::{DirRuleAccessor, RuleCatalog};
/// use converge_test_utils::BundleWriter;
///
/// let bundles = BundleWriter::new()
///     .system("sub", "[query]\nexpr = \"get sub\"\npostprocess = \"result\"\n");
/// let catalog = RuleCatalog::load(&DirRuleAccessor::new(bundles.dir())).unwrap();
/// assert!(catalog.contains("sub"));
/// ```
pub struct BundleWriter {
    temp_dir: TempDir,
    systems: Vec<String>,
}

impl Default for BundleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleWriter {
    /// Create an empty rule directory with an empty root bundle.
    pub fn new() -> Self {
        let writer = Self {
            temp_dir: TempDir::new().unwrap(),
            systems: Vec::new(),
        };
        writer.write_root();
        writer
    }

    /// The rule directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a system bundle with the given TOML content.
    pub fn system(mut self, name: &str, content: &str) -> Self {
        fs::write(self.dir().join(format!("{}.toml", name)), content).unwrap();
        if !self.systems.iter().any(|s| s == name) {
            self.systems.push(name.to_string());
        }
        self.write_root();
        self
    }

    /// Add a system whose rules follow the [`crate::FakeTarget`] conventions:
    /// query `get <name>` with the `result` postprocessor, and the given
    /// `[[rule]]` entries.
    pub fn fake_system(self, name: &str, rules: &str) -> Self {
        let content = format!(
            "[query]\nexpr = \"get {name}\"\npostprocess = \"result\"\n\n[script]\npostprocess = \"outcome\"\n\n{rules}"
        );
        self.system(name, &content)
    }

    /// List a system in the root bundle without writing its bundle.
    pub fn list_only(mut self, name: &str) -> Self {
        self.systems.push(name.to_string());
        self.write_root();
        self
    }

    fn write_root(&self) {
        let listed = self
            .systems
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(self.dir().join("rules.toml"), format!("systems = [{listed}]\n")).unwrap();
    }
}
