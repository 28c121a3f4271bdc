//! Layered settings
//!
//! Settings are merged field by field from, in order:
//! 1. the global file (`<config_dir>/converge/config.toml`)
//! 2. the project file (`./converge.toml`, or an explicit `--config` path)
//! 3. overrides from the command line and environment
//!
//! Later layers win. Missing files are skipped; invalid TOML is an error.
//!
//! ```toml
//! [target]
//! cli = "/opt/wildfly/bin/jboss-cli.sh"
//! controller = "localhost:9990"
//! user = "admin"
//! extra_args = ["--timeout=30000"]
//!
//! [rules]
//! dir = "rules"
//!
//! [run]
//! noop = false
//! max_passes = 20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controller::RunOptions;
use crate::error::{Error, Result};
use crate::process::CliTarget;

/// Default name of the CLI binary when none is configured
pub const DEFAULT_CLI: &str = "jboss-cli.sh";

/// Name of the project settings file
pub const PROJECT_FILE: &str = "converge.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSettings {
    pub cli: Option<PathBuf>,
    pub controller: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesSettings {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    pub noop: Option<bool>,
    pub max_passes: Option<usize>,
}

/// One settings layer, or the merged result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub target: TargetSettings,
    #[serde(default)]
    pub rules: RulesSettings,
    #[serde(default)]
    pub run: RunSettings,
}

impl Settings {
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::SettingsInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a settings file; `None` when it does not exist
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| Error::SettingsUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content).map(Some)
    }

    /// Overlay `other`: every value it sets replaces ours
    pub fn merge(&mut self, other: &Settings) {
        let target = &other.target;
        overlay(&mut self.target.cli, &target.cli);
        overlay(&mut self.target.controller, &target.controller);
        overlay(&mut self.target.user, &target.user);
        overlay(&mut self.target.password, &target.password);
        if !target.extra_args.is_empty() {
            self.target.extra_args = target.extra_args.clone();
        }
        overlay(&mut self.rules.dir, &other.rules.dir);
        overlay(&mut self.run.noop, &other.run.noop);
        overlay(&mut self.run.max_passes, &other.run.max_passes);
    }

    pub fn cli_target(&self) -> CliTarget {
        CliTarget {
            cli: self
                .target
                .cli
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLI)),
            controller: self.target.controller.clone(),
            user: self.target.user.clone(),
            password: self.target.password.clone(),
            extra_args: self.target.extra_args.clone(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            noop: self.run.noop.unwrap_or(false),
            max_passes: self.run.max_passes,
        }
    }
}

fn overlay<T: Clone>(base: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        base.clone_from(other);
    }
}

/// Resolves settings by merging the file layers
pub struct SettingsResolver {
    project_file: PathBuf,
    /// Override for the global config directory (used for testing).
    global_config_dir_override: Option<PathBuf>,
}

impl SettingsResolver {
    /// Resolver for `./converge.toml` under `root`
    pub fn new(root: &Path) -> Self {
        Self {
            project_file: root.join(PROJECT_FILE),
            global_config_dir_override: None,
        }
    }

    /// Use an explicit project settings file instead of `converge.toml`
    pub fn with_project_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file = path.into();
        self
    }

    pub fn with_global_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_config_dir_override = Some(dir.into());
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("converge"))
    }

    /// Merge the file layers, then `overrides`
    pub fn resolve(&self, overrides: &Settings) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(global_dir) = self.global_config_dir() {
            let global_path = global_dir.join("config.toml");
            match Settings::load_optional(&global_path)? {
                Some(global) => {
                    tracing::debug!(?global_path, "Loading global settings");
                    settings.merge(&global);
                }
                None => tracing::debug!(?global_path, "No global settings, skipping"),
            }
        }

        if let Some(project) = Settings::load_optional(&self.project_file)? {
            tracing::debug!(project_file = ?self.project_file, "Loading project settings");
            settings.merge(&project);
        }

        settings.merge(overrides);
        Ok(settings)
    }
}
