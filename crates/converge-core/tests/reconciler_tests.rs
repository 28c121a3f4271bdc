//! Convergence loop behaviour against an in-memory target

use converge_core::{ConvergenceStatus, Error, Reconciler, RunOptions};
use converge_model::{Action, InputDocument, ValueTree};
use converge_rules::{DirRuleAccessor, RuleCatalog};
use converge_test_utils::{BundleWriter, FakeTarget};
use pretty_assertions::assert_eq;
use serde_json::json;

fn doc(source: &str, value: serde_json::Value) -> InputDocument {
    InputDocument::new(source, ValueTree::from_json(value)).unwrap()
}

fn load(bundles: &BundleWriter) -> RuleCatalog {
    RuleCatalog::load(&DirRuleAccessor::new(bundles.dir())).unwrap()
}

const SET_RULES: &str = r#"
[[rule]]
name = "add"
action = "add"
pattern = "sub/*"
script = ["set ${path} ${new}"]

[[rule]]
name = "replace"
action = "replace"
pattern = "sub/*"
script = ["set ${path} ${new}"]

[[rule]]
name = "remove"
action = "remove"
pattern = "sub/*"
script = ["remove ${path}"]
"#;

#[test]
fn scenario_a_add_is_executed() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let report = reconciler.run(&[doc("a.json", json!({"sub": {"a": "1"}}))]).unwrap();

    let system = &report.systems[0];
    assert_eq!(system.executed, 1);
    assert_eq!(system.scripts[0].rule, "add");
    assert_eq!(system.status, ConvergenceStatus::Converged);
    assert_eq!(reconciler.executor().script_lines(), vec!["set sub/a 1"]);
    assert_eq!(reconciler.executor().state_json(), json!({"sub": {"a": "1"}}));
}

#[test]
fn scenario_b_already_converged() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let target = FakeTarget::with_state(json!({"sub": {"a": "1"}}));
    let mut reconciler = Reconciler::new(&catalog, target, RunOptions::default());

    let report = reconciler.run(&[doc("b.json", json!({"sub": {"a": "1"}}))]).unwrap();

    assert_eq!(report.systems[0].passes, 1);
    assert_eq!(report.systems[0].executed, 0);
    assert!(reconciler.executor().script_lines().is_empty());
}

#[test]
fn scenario_c_refresh_requeries_before_done() {
    let rules = r#"
[[rule]]
name = "replace"
action = "replace"
pattern = "sub/*"
script = ["set ${path} ${new}"]
refresh = true
"#;
    let bundles = BundleWriter::new().fake_system("sub", rules);
    let catalog = load(&bundles);
    let target = FakeTarget::with_state(json!({"sub": {"a": "1"}}));
    let mut reconciler = Reconciler::new(&catalog, target, RunOptions::default());

    let report = reconciler.run(&[doc("c.json", json!({"sub": {"a": "2"}}))]).unwrap();

    let system = &report.systems[0];
    assert_eq!(system.refreshes, 1);
    assert_eq!(system.passes, 2);
    assert_eq!(system.executed, 1);
    assert_eq!(reconciler.executor().query_count(), 2);
    assert_eq!(
        reconciler.executor().history(),
        ["get sub", "set sub/a 2", "get sub"]
    );
}

#[test]
fn scenario_d_unresolved_is_a_warning() {
    let rules = r#"
[[rule]]
name = "remove-only"
action = "remove"
pattern = "**"
script = ["remove ${path}"]
"#;
    let bundles = BundleWriter::new().fake_system("x", rules);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let report = reconciler.run(&[doc("d.json", json!({"x": "1"}))]).unwrap();

    let system = &report.systems[0];
    assert_eq!(system.status, ConvergenceStatus::ConvergedWithWarnings);
    assert_eq!(system.unresolved.len(), 1);
    assert_eq!(system.unresolved[0].action(), Action::Add);
    assert_eq!(system.passes, 1);
    assert!(report.has_warnings());
}

#[test]
fn scenario_e_unknown_system_fails_before_any_query() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let err = reconciler
        .run(&[
            doc("ok.json", json!({"sub": {"a": "1"}})),
            doc("bad.json", json!({"other": {}})),
        ])
        .unwrap_err();

    match err {
        Error::UnknownSystem {
            system,
            source_name,
        } => {
            assert_eq!(system, "other");
            assert_eq!(source_name, "bad.json");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(reconciler.executor().history().is_empty());
}

#[test]
fn removes_run_after_adds_and_replaces() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let target = FakeTarget::with_state(json!({"sub": {"old": "x", "a": "1"}}));
    let mut reconciler = Reconciler::new(&catalog, target, RunOptions::default());

    reconciler
        .run(&[doc("mix.json", json!({"sub": {"a": "2", "b": "3"}}))])
        .unwrap();

    assert_eq!(
        reconciler.executor().script_lines(),
        vec!["set sub/b 3", "set sub/a 2", "remove sub/old"]
    );
    assert_eq!(
        reconciler.executor().state_json(),
        json!({"sub": {"a": "2", "b": "3"}})
    );
}

#[test]
fn systems_follow_catalog_order_and_inputs_follow_supplied_order() {
    let bundles = BundleWriter::new()
        .fake_system("second", SET_RULES.replace("sub/", "second/").as_str())
        .fake_system("first", SET_RULES.replace("sub/", "first/").as_str());
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let report = reconciler
        .run(&[
            doc("one.json", json!({"first": {"a": "1"}, "second": {"a": "1"}})),
            doc("two.json", json!({"second": {"b": "2"}})),
        ])
        .unwrap();

    let order: Vec<(&str, &str)> = report
        .systems
        .iter()
        .map(|s| (s.system.as_str(), s.source.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("second", "one.json"),
            ("second", "two.json"),
            ("first", "one.json")
        ]
    );
}

#[test]
fn each_input_requeries_live_state() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let report = reconciler
        .run(&[
            doc("one.json", json!({"sub": {"a": "1"}})),
            doc("two.json", json!({"sub": {"a": "1", "b": "2"}})),
        ])
        .unwrap();

    assert_eq!(reconciler.executor().query_count(), 2);
    // The second input sees the first input's result, so only `b` is added
    assert_eq!(report.systems[1].executed, 1);
    assert_eq!(report.systems[1].scripts[0].lines, vec!["set sub/b 2"]);
}

#[test]
fn second_input_removes_what_first_added() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    reconciler
        .run(&[
            doc("one.json", json!({"sub": {"a": "1"}})),
            doc("two.json", json!({"sub": {"b": "2"}})),
        ])
        .unwrap();

    assert_eq!(reconciler.executor().state_json(), json!({"sub": {"b": "2"}}));
}

#[test]
fn duplicate_rules_both_apply() {
    let rules = r#"
[[rule]]
name = "first"
action = "add"
pattern = "sub/*"
script = ["set ${path} ${new}"]

[[rule]]
name = "again"
action = "add"
pattern = "sub/**"
script = ["echo ${rule} ${path}"]
"#;
    let bundles = BundleWriter::new().fake_system("sub", rules);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let report = reconciler.run(&[doc("dup.json", json!({"sub": {"a": "1"}}))]).unwrap();

    assert_eq!(report.systems[0].executed, 2);
    assert_eq!(
        reconciler.executor().script_lines(),
        vec!["set sub/a 1", "echo again sub/a"]
    );
}

#[test]
fn noop_is_order_stable_and_changes_nothing() {
    let bundles = BundleWriter::new().fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let options = RunOptions {
        noop: true,
        max_passes: None,
    };
    let documents = [doc("n.json", json!({"sub": {"c": "3", "a": "1", "b": "2"}}))];

    let mut scripts = Vec::new();
    for _ in 0..3 {
        let target = FakeTarget::with_state(json!({"sub": {"z": "0"}}));
        let mut reconciler = Reconciler::new(&catalog, target, options);
        let report = reconciler.run(&documents).unwrap();
        assert!(reconciler.executor().script_lines().is_empty());
        assert_eq!(
            reconciler.executor().state_json(),
            json!({"sub": {"z": "0"}})
        );
        scripts.push(report.scripts().cloned().collect::<Vec<_>>());
    }

    assert_eq!(scripts[0], scripts[1]);
    assert_eq!(scripts[1], scripts[2]);
    let lines: Vec<&str> = scripts[0].iter().map(|s| s.lines[0].as_str()).collect();
    assert_eq!(
        lines,
        vec!["set sub/c 3", "set sub/a 1", "set sub/b 2", "remove sub/z"]
    );
}

#[test]
fn noop_with_refresh_rules_plans_like_a_real_run() {
    let rules = r#"
[[rule]]
name = "add"
action = "add"
pattern = "sub/*"
script = ["set ${path} ${new}"]
refresh = true

[[rule]]
name = "replace"
action = "replace"
pattern = "sub/*"
script = ["set ${path} ${new}"]
refresh = true
"#;
    let bundles = BundleWriter::new().fake_system("sub", rules);
    let catalog = load(&bundles);
    let live = json!({"sub": {"a": "1"}});
    let documents = [doc("r.json", json!({"sub": {"a": "2", "b": "3"}}))];

    let mut real = Reconciler::new(
        &catalog,
        FakeTarget::with_state(live.clone()),
        RunOptions::default(),
    );
    let applied = real.run(&documents).unwrap();

    let options = RunOptions {
        noop: true,
        max_passes: None,
    };
    let mut dry = Reconciler::new(&catalog, FakeTarget::with_state(live.clone()), options);
    let planned = dry.run(&documents).unwrap();

    assert_eq!(
        planned.scripts().cloned().collect::<Vec<_>>(),
        applied.scripts().cloned().collect::<Vec<_>>()
    );
    assert_eq!(planned.systems[0].passes, applied.systems[0].passes);
    assert_eq!(planned.systems[0].passes, 3);
    assert_eq!(dry.executor().query_count(), 1);
    assert_eq!(dry.executor().state_json(), live);
}

#[test]
fn refresh_rule_on_frozen_target_hits_pass_limit() {
    let rules = r#"
[[rule]]
name = "stuck"
action = "add"
pattern = "sub/*"
script = ["set ${path} ${new}"]
refresh = true
"#;
    let bundles = BundleWriter::new().fake_system("sub", rules);
    let catalog = load(&bundles);
    let mut target = FakeTarget::new();
    target.frozen = true;
    let options = RunOptions {
        noop: false,
        max_passes: Some(4),
    };
    let mut reconciler = Reconciler::new(&catalog, target, options);

    let err = reconciler
        .run(&[doc("stuck.json", json!({"sub": {"a": "1"}}))])
        .unwrap_err();
    assert!(matches!(err, Error::PassLimitExceeded { passes: 4, .. }));
    assert_eq!(reconciler.executor().script_lines().len(), 4);
}

#[test]
fn command_failure_aborts_remaining_systems() {
    let failing = r#"
[[rule]]
name = "boom"
action = "add"
pattern = "**"
script = ["fail no such resource"]
"#;
    let bundles = BundleWriter::new()
        .fake_system("broken", failing)
        .fake_system("sub", SET_RULES);
    let catalog = load(&bundles);
    let mut reconciler = Reconciler::new(&catalog, FakeTarget::new(), RunOptions::default());

    let err = reconciler
        .run(&[doc("f.json", json!({"broken": {"a": "1"}, "sub": {"a": "1"}}))])
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Reconcile { ref system, ref source_name, ref source }
            if system == "broken"
                && source_name == "f.json"
                && matches!(**source, Error::CommandExecution { .. })
    ));
    assert!(err.to_string().contains("no such resource"));
    assert!(!reconciler.executor().history().iter().any(|l| l == "get sub"));
}

#[test]
fn server_preprocessing_normalises_live_state() {
    let content = r#"
[query]
expr = "get sub"
postprocess = "result"

[[preprocess.server]]
kind = "drop"
pattern = "sub/uptime"

[[preprocess.client]]
kind = "default"
path = "sub/level"
value = "INFO"
"#;
    let bundles = BundleWriter::new().system("sub", content);
    let catalog = load(&bundles);
    let target = FakeTarget::with_state(json!({"sub": {"level": "INFO", "uptime": "42"}}));
    let mut reconciler = Reconciler::new(&catalog, target, RunOptions::default());

    let report = reconciler.run(&[doc("p.json", json!({"sub": {}}))]).unwrap();

    assert_eq!(report.systems[0].status, ConvergenceStatus::Converged);
    assert_eq!(report.systems[0].executed, 0);
}
