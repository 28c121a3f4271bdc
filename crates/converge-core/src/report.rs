//! Run reports
//!
//! Provides the serializable summary of a reconciliation run, one
//! [`SystemReport`] per (system, input document) pair.

use converge_model::Diff;
use serde::Serialize;

use crate::apply::ExecutedScript;

/// Final state of one (system, input) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvergenceStatus {
    /// No diffs were left unresolved
    Converged,
    /// The last pass left diffs no rule matched
    ConvergedWithWarnings,
}

/// Outcome of reconciling one system from one input document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    pub system: String,
    pub source: String,
    /// Diff/apply passes, the final one included
    pub passes: usize,
    /// Live-state re-queries triggered by rules
    pub refreshes: usize,
    /// Rule matches over all passes
    pub executed: usize,
    pub scripts: Vec<ExecutedScript>,
    pub unresolved: Vec<Diff>,
    pub status: ConvergenceStatus,
}

impl SystemReport {
    pub fn new(system: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            source: source.into(),
            passes: 0,
            refreshes: 0,
            executed: 0,
            scripts: Vec::new(),
            unresolved: Vec::new(),
            status: ConvergenceStatus::Converged,
        }
    }

    /// Record the unresolved diffs of the final pass and settle the status
    pub fn finish(mut self, unresolved: Vec<Diff>) -> Self {
        self.status = if unresolved.is_empty() {
            ConvergenceStatus::Converged
        } else {
            ConvergenceStatus::ConvergedWithWarnings
        };
        self.unresolved = unresolved;
        self
    }

    pub fn has_warnings(&self) -> bool {
        self.status == ConvergenceStatus::ConvergedWithWarnings
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub noop: bool,
    pub systems: Vec<SystemReport>,
}

impl RunReport {
    pub fn new(noop: bool) -> Self {
        Self {
            noop,
            systems: Vec::new(),
        }
    }

    pub fn push(&mut self, report: SystemReport) {
        self.systems.push(report);
    }

    pub fn has_warnings(&self) -> bool {
        self.systems.iter().any(SystemReport::has_warnings)
    }

    /// Total rule matches over every system
    pub fn executed(&self) -> usize {
        self.systems.iter().map(|s| s.executed).sum()
    }

    /// All generated scripts in execution order
    pub fn scripts(&self) -> impl Iterator<Item = &ExecutedScript> {
        self.systems.iter().flat_map(|s| s.scripts.iter())
    }
}
