//! Per-system rule sets and the catalog that holds them
//!
//! A [`RuleSet`] carries everything the reconciler needs for one system:
//! the ordered rules, client and server preprocessing, the live-state
//! query and how remediation output is post-processed. The
//! [`RuleCatalog`] is loaded once through a [`RuleAccessor`] and is
//! immutable afterwards.

use serde::Deserialize;

use converge_model::{Action, ValueTree};

use crate::accessor::{Properties, RuleAccessor};
use crate::error::{Error, Result};
use crate::postprocess::ResultPostprocessor;
use crate::rule::MatchRule;
use crate::transform::{Transform, apply_all};

/// Name of the bundle that lists the known systems
pub const ROOT_BUNDLE: &str = "rules";

/// How to fetch the live state of a system
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDescriptor {
    pub expr: String,
    #[serde(default)]
    pub postprocess: ResultPostprocessor,
}

impl QueryDescriptor {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            postprocess: ResultPostprocessor::Raw,
        }
    }

    pub fn with_postprocess(mut self, postprocess: ResultPostprocessor) -> Self {
        self.postprocess = postprocess;
        self
    }
}

/// Rules and preprocessing for one system
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    name: String,
    rules: Vec<MatchRule>,
    client_preprocess: Vec<Transform>,
    server_preprocess: Vec<Transform>,
    query: QueryDescriptor,
    script_postprocess: ResultPostprocessor,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, query: QueryDescriptor) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            client_preprocess: Vec::new(),
            server_preprocess: Vec::new(),
            query,
            script_postprocess: ResultPostprocessor::Raw,
        }
    }

    /// Append a rule; it gets the lowest priority so far
    pub fn with_rule(mut self, rule: MatchRule) -> Result<Self> {
        if self.rule(&rule.name).is_some() {
            return Err(Error::DuplicateRule {
                system: self.name.clone(),
                rule: rule.name,
            });
        }
        self.rules.push(rule);
        Ok(self)
    }

    pub fn with_client_transform(mut self, transform: Transform) -> Self {
        self.client_preprocess.push(transform);
        self
    }

    pub fn with_server_transform(mut self, transform: Transform) -> Self {
        self.server_preprocess.push(transform);
        self
    }

    pub fn with_script_postprocess(mut self, postprocess: ResultPostprocessor) -> Self {
        self.script_postprocess = postprocess;
        self
    }

    /// Build a rule set from the content of a `<system>` bundle
    pub fn from_properties(name: &str, properties: Properties) -> Result<Self> {
        let bundle: SystemBundle = toml::Value::Table(properties)
            .try_into()
            .map_err(|e: toml::de::Error| Error::bundle(name, e.message().to_string()))?;

        let mut ruleset = Self::new(name, bundle.query)
            .with_script_postprocess(bundle.script.postprocess);
        ruleset.client_preprocess = bundle.preprocess.client;
        ruleset.server_preprocess = bundle.preprocess.server;

        for entry in bundle.rules {
            let rule = MatchRule::new(&entry.name, entry.action, &entry.pattern)
                .and_then(|rule| rule.with_script(entry.script.as_slice()))
                .map_err(|e| Error::bundle(name, format!("rule '{}': {}", entry.name, e)))?
                .with_refresh(entry.refresh);
            ruleset = ruleset.with_rule(rule)?;
        }

        tracing::debug!("Loaded {} rules for system {}", ruleset.rules.len(), name);
        Ok(ruleset)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rules in priority order
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&MatchRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn query(&self) -> &QueryDescriptor {
        &self.query
    }

    pub fn script_postprocess(&self) -> ResultPostprocessor {
        self.script_postprocess
    }

    /// Normalise a desired tree before indexing
    pub fn apply_client_preprocessing(&self, desired: &ValueTree) -> ValueTree {
        apply_all(&self.client_preprocess, desired)
    }

    /// Normalise a freshly queried live tree before indexing
    pub fn apply_server_preprocessing(&self, live: &ValueTree) -> ValueTree {
        apply_all(&self.server_preprocess, live)
    }
}

/// All rule sets known to a run, in system processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    rulesets: Vec<RuleSet>,
}

impl RuleCatalog {
    /// Load the root bundle and one bundle per listed system
    pub fn load(accessor: &dyn RuleAccessor) -> Result<Self> {
        let root: RootBundle = toml::Value::Table(accessor.load_properties(ROOT_BUNDLE)?)
            .try_into()
            .map_err(|e: toml::de::Error| Error::bundle(ROOT_BUNDLE, e.message().to_string()))?;

        let mut rulesets = Vec::with_capacity(root.systems.len());
        for system in &root.systems {
            let properties = accessor.load_properties(system)?;
            rulesets.push(RuleSet::from_properties(system, properties)?);
        }

        let catalog = Self::from_rulesets(rulesets)?;
        tracing::info!("Loaded rules for {} systems", catalog.len());
        Ok(catalog)
    }

    pub fn from_rulesets(rulesets: Vec<RuleSet>) -> Result<Self> {
        for (idx, ruleset) in rulesets.iter().enumerate() {
            if rulesets[..idx].iter().any(|other| other.name == ruleset.name) {
                return Err(Error::bundle(
                    ROOT_BUNDLE,
                    format!("system {} is listed twice", ruleset.name),
                ));
            }
        }
        Ok(Self { rulesets })
    }

    pub fn get(&self, system: &str) -> Option<&RuleSet> {
        self.rulesets.iter().find(|ruleset| ruleset.name == system)
    }

    pub fn contains(&self, system: &str) -> bool {
        self.get(system).is_some()
    }

    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.rulesets.iter().map(|ruleset| ruleset.name.as_str())
    }

    pub fn rulesets(&self) -> &[RuleSet] {
        &self.rulesets
    }

    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RootBundle {
    systems: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SystemBundle {
    query: QueryDescriptor,
    #[serde(default)]
    script: ScriptSection,
    #[serde(default)]
    preprocess: PreprocessSection,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptSection {
    #[serde(default)]
    postprocess: ResultPostprocessor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PreprocessSection {
    #[serde(default)]
    client: Vec<Transform>,
    #[serde(default)]
    server: Vec<Transform>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    name: String,
    action: Action,
    pattern: String,
    #[serde(default)]
    script: Vec<String>,
    #[serde(default)]
    refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn props(text: &str) -> Properties {
        text.parse().unwrap()
    }

    const LOGGING: &str = r#"
        [query]
        expr = "/subsystem=logging:read-resource(recursive=true)"
        postprocess = "result"

        [script]
        postprocess = "outcome"

        [[preprocess.server]]
        kind = "default"
        path = "logging/level"
        value = "INFO"

        [[rule]]
        name = "add-handler"
        action = "add"
        pattern = "logging/handler/*/**"
        script = ["/subsystem=logging/console-handler=${segment(2)}:add"]
        refresh = true

        [[rule]]
        name = "ack-level"
        action = "replace"
        pattern = "logging/level"
    "#;

    #[test]
    fn test_from_properties() {
        let ruleset = RuleSet::from_properties("logging", props(LOGGING)).unwrap();
        assert_eq!(ruleset.name(), "logging");
        assert_eq!(ruleset.query().postprocess, ResultPostprocessor::Result);
        assert_eq!(ruleset.script_postprocess(), ResultPostprocessor::Outcome);
        assert_eq!(ruleset.rules().len(), 2);
        assert!(ruleset.rules()[0].needs_refresh);
        assert!(ruleset.rule("ack-level").unwrap().script.is_empty());
        assert!(ruleset.rule("missing").is_none());
    }

    #[test]
    fn test_server_preprocessing() {
        let ruleset = RuleSet::from_properties("logging", props(LOGGING)).unwrap();
        let live = ValueTree::from_json(json!({"logging": {}}));
        assert_eq!(
            ruleset.apply_server_preprocessing(&live),
            ValueTree::from_json(json!({"logging": {"level": "INFO"}}))
        );
        assert_eq!(ruleset.apply_client_preprocessing(&live), live);
    }

    #[test]
    fn test_missing_query_rejected() {
        let err = RuleSet::from_properties("x", props("[[rule]]\nname = \"a\"\naction = \"add\"\npattern = \"x\"\n"))
            .unwrap_err();
        assert!(matches!(err, Error::Bundle { .. }));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let text = "[query]\nexpr = \"q\"\n[[rule]]\nname = \"a\"\naction = \"upsert\"\npattern = \"x\"\n";
        assert!(RuleSet::from_properties("x", props(text)).is_err());
    }

    #[test]
    fn test_bad_template_names_rule() {
        let text = "[query]\nexpr = \"q\"\n[[rule]]\nname = \"broken\"\naction = \"add\"\npattern = \"x\"\nscript = [\"${nope}\"]\n";
        let err = RuleSet::from_properties("x", props(text)).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let text = "[query]\nexpr = \"q\"\n\
                    [[rule]]\nname = \"a\"\naction = \"add\"\npattern = \"x\"\n\
                    [[rule]]\nname = \"a\"\naction = \"remove\"\npattern = \"x\"\n";
        assert!(matches!(
            RuleSet::from_properties("x", props(text)).unwrap_err(),
            Error::DuplicateRule { .. }
        ));
    }

    #[test]
    fn test_catalog_keeps_listed_order() {
        let mut bundles = BTreeMap::new();
        bundles.insert("rules".to_string(), props("systems = [\"zeta\", \"alpha\"]"));
        bundles.insert("zeta".to_string(), props("[query]\nexpr = \"z\"\n"));
        bundles.insert("alpha".to_string(), props("[query]\nexpr = \"a\"\n"));

        let catalog = RuleCatalog::load(&bundles).unwrap();
        assert_eq!(catalog.system_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(catalog.get("alpha").unwrap().query().expr, "a");
        assert!(!catalog.contains("beta"));
    }

    #[test]
    fn test_catalog_missing_system_bundle() {
        let mut bundles = BTreeMap::new();
        bundles.insert("rules".to_string(), props("systems = [\"ghost\"]"));
        assert!(RuleCatalog::load(&bundles).is_err());
    }

    #[test]
    fn test_catalog_duplicate_system() {
        let q = RuleSet::new("a", QueryDescriptor::new("q"));
        assert!(RuleCatalog::from_rulesets(vec![q.clone(), q]).is_err());
    }
}
