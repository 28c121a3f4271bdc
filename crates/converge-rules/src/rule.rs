//! Remediation rules
//!
//! A [`MatchRule`] maps diffs of one action whose path matches a pattern to
//! a script. Rules live in an ordered list; declaration order is priority.

use converge_model::{Action, Diff, PathIndex, PathPattern};

use crate::error::Result;
use crate::script::{ScriptContext, ScriptTemplate};

/// A declarative mapping from diff action and path to a remediation script
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRule {
    /// Unique within its system
    pub name: String,
    pub action: Action,
    pub pattern: PathPattern,
    /// Empty for rules that only acknowledge a diff
    pub script: Vec<ScriptTemplate>,
    /// Live state must be re-queried after this rule runs
    pub needs_refresh: bool,
}

impl MatchRule {
    pub fn new(name: impl Into<String>, action: Action, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            action,
            pattern: PathPattern::compile(pattern)?,
            script: Vec::new(),
            needs_refresh: false,
        })
    }

    /// Compile and attach script lines
    pub fn with_script<S: AsRef<str>>(mut self, lines: &[S]) -> Result<Self> {
        self.script = lines
            .iter()
            .map(|line| ScriptTemplate::compile(line.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn with_refresh(mut self, needs_refresh: bool) -> Self {
        self.needs_refresh = needs_refresh;
        self
    }

    /// True when `diff` has this rule's action and its path matches the pattern
    pub fn matches(&self, diff: &Diff) -> bool {
        diff.action() == self.action && self.pattern.matches(diff.path())
    }

    /// Render the script for `diff`; empty when the rule has no script
    pub fn generate_script(&self, diff: &Diff, desired: &PathIndex) -> Vec<String> {
        let ctx = ScriptContext {
            rule: &self.name,
            diff,
            desired,
        };
        self.script.iter().map(|line| line.render(&ctx)).collect()
    }
}
