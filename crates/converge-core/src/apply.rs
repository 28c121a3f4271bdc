//! Rule application for one pass
//!
//! Rules are tried in declaration order, and each rule sees the whole diff
//! sequence. A diff resolved by one rule stays eligible for the rules after
//! it; resolution only keeps it out of the unresolved report. A rule that
//! needs a refresh ends the pass right after its script runs.

use converge_model::{Diff, PathIndex};
use converge_rules::RuleSet;
use serde::Serialize;

use crate::Result;
use crate::executor::CommandExecutor;

/// A script generated for one diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedScript {
    pub rule: String,
    pub path: String,
    pub lines: Vec<String>,
}

/// What one pass of rule application did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    /// Number of rule matches, acknowledged diffs included
    pub executed: usize,
    /// Scripts in execution order
    pub scripts: Vec<ExecutedScript>,
    /// Diffs some rule matched, in diff order
    pub resolved: Vec<Diff>,
    /// Diffs no rule matched; empty when a refresh was requested
    pub unresolved: Vec<Diff>,
    pub refresh_requested: bool,
}

/// Apply `ruleset` to `diffs`, running scripts through `executor`
///
/// In no-op mode scripts are logged and not executed; the control flow is
/// otherwise identical.
pub fn apply_rules<E: CommandExecutor + ?Sized>(
    ruleset: &RuleSet,
    diffs: &[Diff],
    desired: &PathIndex,
    executor: &mut E,
    noop: bool,
) -> Result<RuleOutcome> {
    let mut outcome = RuleOutcome::default();
    let mut resolved = vec![false; diffs.len()];

    for rule in ruleset.rules() {
        tracing::debug!("Checking rule {}", rule.name);
        for (idx, diff) in diffs.iter().enumerate() {
            if !rule.matches(diff) {
                continue;
            }

            resolved[idx] = true;
            outcome.executed += 1;
            tracing::debug!("{} will be run on {}", rule.name, diff);

            let lines = rule.generate_script(diff, desired);
            if !lines.is_empty() {
                for line in &lines {
                    if noop {
                        tracing::info!("[noop] {}", line);
                    } else {
                        tracing::info!("run: {}", line);
                    }
                }
                if !noop {
                    executor.run(&lines, ruleset.script_postprocess())?;
                }
                outcome.scripts.push(ExecutedScript {
                    rule: rule.name.clone(),
                    path: diff.path().to_string(),
                    lines,
                });
            }

            if rule.needs_refresh {
                tracing::debug!("Rule {} requested a refresh", rule.name);
                outcome.refresh_requested = true;
                outcome.resolved = select(diffs, &resolved, true);
                return Ok(outcome);
            }
        }
    }

    outcome.resolved = select(diffs, &resolved, true);
    outcome.unresolved = select(diffs, &resolved, false);

    if !outcome.unresolved.is_empty() {
        let listing = outcome
            .unresolved
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!("No rules for diffs in {}: {}", ruleset.name(), listing);
    }

    Ok(outcome)
}

fn select(diffs: &[Diff], resolved: &[bool], wanted: bool) -> Vec<Diff> {
    diffs
        .iter()
        .zip(resolved)
        .filter(|(_, resolved)| **resolved == wanted)
        .map(|(diff, _)| diff.clone())
        .collect()
}
