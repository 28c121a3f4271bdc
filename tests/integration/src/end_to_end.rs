//! End-to-end flow across the workspace crates
//!
//! settings file -> rule directory -> documents on disk -> reconciliation
//! against an in-memory target -> second run proves the fixpoint.

use converge_core::{ConvergenceStatus, Reconciler, Settings, SettingsResolver};
use converge_model::load_document;
use converge_rules::{DirRuleAccessor, RuleCatalog};
use converge_test_utils::{BundleWriter, FakeTarget};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const LOGGING_RULES: &str = r#"
[[rule]]
name = "add-setting"
action = "add"
pattern = "logging/**"
script = ["set ${path} ${new}"]

[[rule]]
name = "change-setting"
action = "replace"
pattern = "logging/**"
script = ["set ${path} ${new}"]

[[rule]]
name = "drop-setting"
action = "remove"
pattern = "logging/**"
script = ["remove ${path}"]
"#;

const DATASOURCE_RULES: &str = r#"
[[preprocess.client]]
kind = "rename"
pattern = "datasources/pools"
to = "data-source"

[[rule]]
name = "add-pool-attribute"
action = "add"
pattern = "datasources/data-source/*/*"
script = ["set ${path} ${new}"]
"#;

const LOGGING_YAML: &str = r#"
logging:
  level: INFO
  handler:
    console:
      level: DEBUG
"#;

const DATASOURCE_JSON: &str = r#"{
  "datasources": {
    "pools": {
      "ExampleDS": {"jndi": "java:/ExampleDS", "driver": "h2"}
    }
  }
}"#;

struct Workspace {
    temp: TempDir,
    _bundles: BundleWriter,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let bundles = BundleWriter::new()
            .fake_system("logging", LOGGING_RULES)
            .fake_system("datasources", DATASOURCE_RULES);

        fs::write(
            temp.path().join("converge.toml"),
            format!(
                "[rules]\ndir = {:?}\n\n[run]\nmax_passes = 5\n",
                bundles.dir().display().to_string()
            ),
        )
        .unwrap();
        fs::write(temp.path().join("logging.yaml"), LOGGING_YAML).unwrap();
        fs::write(temp.path().join("datasources.json"), DATASOURCE_JSON).unwrap();

        Self {
            temp,
            _bundles: bundles,
        }
    }

    fn settings(&self) -> Settings {
        SettingsResolver::new(self.temp.path())
            .with_global_config_dir(self.temp.path().join("global"))
            .resolve(&Settings::default())
            .unwrap()
    }

    fn catalog(&self, settings: &Settings) -> RuleCatalog {
        let dir = settings.rules.dir.as_ref().unwrap();
        RuleCatalog::load(&DirRuleAccessor::new(dir)).unwrap()
    }

    fn documents(&self) -> Vec<converge_model::InputDocument> {
        ["datasources.json", "logging.yaml"]
            .iter()
            .map(|name| load_document(&self.temp.path().join(name)).unwrap())
            .collect()
    }
}

#[test]
fn test_files_to_fixpoint() {
    let workspace = Workspace::new();
    let settings = workspace.settings();
    let catalog = workspace.catalog(&settings);
    let documents = workspace.documents();

    let target = FakeTarget::with_state(json!({
        "logging": {"level": "WARN", "stale": "x"}
    }));
    let mut reconciler = Reconciler::new(&catalog, target, settings.run_options());
    let report = reconciler.run(&documents).unwrap();

    // Catalog order, not document order
    let systems: Vec<_> = report.systems.iter().map(|s| s.system.as_str()).collect();
    assert_eq!(systems, ["logging", "datasources"]);
    assert!(report.systems[0].source.ends_with("logging.yaml"));
    assert!(!report.has_warnings());
    assert_eq!(report.executed(), 5);

    // Rules run in declaration order, each over the whole diff sequence
    assert_eq!(
        reconciler.executor().history(),
        [
            "get logging",
            "set logging/handler/console/level DEBUG",
            "set logging/level INFO",
            "remove logging/stale",
            "get datasources",
            "set datasources/data-source/ExampleDS/jndi java:/ExampleDS",
            "set datasources/data-source/ExampleDS/driver h2",
        ]
    );
    assert_eq!(
        reconciler.executor().state_json(),
        json!({
            "logging": {"level": "INFO", "handler": {"console": {"level": "DEBUG"}}},
            "datasources": {
                "data-source": {"ExampleDS": {"jndi": "java:/ExampleDS", "driver": "h2"}}
            }
        })
    );

    // A second run against the converged target changes nothing
    let target = reconciler.into_executor();
    let mut reconciler = Reconciler::new(&catalog, target, settings.run_options());
    let report = reconciler.run(&documents).unwrap();

    assert_eq!(report.executed(), 0);
    assert!(
        report
            .systems
            .iter()
            .all(|s| s.passes == 1 && s.status == ConvergenceStatus::Converged)
    );
    assert!(reconciler.executor().script_lines().is_empty());
}

#[test]
fn test_noop_run_reports_the_real_plan() {
    let workspace = Workspace::new();
    let mut settings = workspace.settings();
    let catalog = workspace.catalog(&settings);
    let documents = workspace.documents();
    let initial = json!({"logging": {"level": "WARN"}});

    settings.run.noop = Some(true);
    let mut dry = Reconciler::new(
        &catalog,
        FakeTarget::with_state(initial.clone()),
        settings.run_options(),
    );
    let planned = dry.run(&documents).unwrap();

    assert!(planned.noop);
    assert!(dry.executor().script_lines().is_empty());
    assert_eq!(dry.executor().state_json(), initial);

    settings.run.noop = Some(false);
    let mut real = Reconciler::new(
        &catalog,
        FakeTarget::with_state(initial),
        settings.run_options(),
    );
    let applied = real.run(&documents).unwrap();

    let planned_lines: Vec<_> = planned.scripts().flat_map(|s| s.lines.clone()).collect();
    assert_eq!(planned_lines, real.executor().script_lines());
    assert_eq!(planned.executed(), applied.executed());
}

#[test]
fn test_document_without_known_systems_is_rejected() {
    let workspace = Workspace::new();
    let settings = workspace.settings();
    let catalog = workspace.catalog(&settings);

    let path = workspace.temp.path().join("other.json");
    fs::write(&path, r#"{"messaging": {"queue": "q1"}}"#).unwrap();
    let mut documents = workspace.documents();
    documents.push(load_document(&path).unwrap());

    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), settings.run_options());
    let err = reconciler.run(&documents).unwrap_err();

    assert!(err.to_string().contains("messaging"));
    assert_eq!(reconciler.executor().query_count(), 0);
}
