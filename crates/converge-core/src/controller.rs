//! The convergence loop
//!
//! For every system, in rule-catalog order, and every input document that
//! defines it, in the order supplied:
//!
//! 1. query live state and apply server preprocessing
//! 2. extract the system's desired subtree and apply client preprocessing
//! 3. index both trees and compute diffs
//! 4. apply rules; on a refresh request re-query and go back to 3
//!
//! Each (system, input) pair starts from a fresh live-state query. In no-op
//! mode nothing changes on the target, so a refresh re-diffs against the
//! current index with the resolved diffs applied instead of re-querying.

use converge_model::{InputDocument, Mapping, PathIndex, ValueTree, compute_difference};
use converge_rules::{RuleCatalog, RuleSet};

use crate::apply::apply_rules;
use crate::error::{Error, Result};
use crate::executor::CommandExecutor;
use crate::report::{RunReport, SystemReport};

/// Options fixed for the duration of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log generated scripts instead of executing them
    pub noop: bool,
    /// Abort a system after this many passes; unbounded when `None`
    pub max_passes: Option<usize>,
}

/// Drives desired state onto a live target through a [`CommandExecutor`]
pub struct Reconciler<'a, E: CommandExecutor> {
    catalog: &'a RuleCatalog,
    executor: E,
    options: RunOptions,
}

impl<'a, E: CommandExecutor> Reconciler<'a, E> {
    pub fn new(catalog: &'a RuleCatalog, executor: E, options: RunOptions) -> Self {
        Self {
            catalog,
            executor,
            options,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Reject documents that name a system without rules
    pub fn validate(&self, documents: &[InputDocument]) -> Result<()> {
        for document in documents {
            for system in document.system_names() {
                if !self.catalog.contains(system) {
                    return Err(Error::UnknownSystem {
                        system: system.to_string(),
                        source_name: document.source.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reconcile every document; nothing is queried if validation fails
    pub fn run(&mut self, documents: &[InputDocument]) -> Result<RunReport> {
        self.validate(documents)?;

        let mut report = RunReport::new(self.options.noop);
        let catalog = self.catalog;
        for ruleset in catalog.rulesets() {
            for document in documents.iter().filter(|doc| doc.defines(ruleset.name())) {
                let system = self
                    .reconcile(ruleset, document)
                    .map_err(|e| e.in_context(ruleset.name(), &document.source))?;
                report.push(system);
            }
        }
        Ok(report)
    }

    fn reconcile(&mut self, ruleset: &RuleSet, document: &InputDocument) -> Result<SystemReport> {
        let system = ruleset.name();
        let span = tracing::info_span!("reconcile", system, source = %document.source);
        let _enter = span.enter();
        tracing::info!("Processing {} from {}", system, document.source);

        let desired_tree = document
            .tree
            .subtree(system)
            .unwrap_or_else(ValueTree::empty_mapping);
        let desired_tree = ruleset.apply_client_preprocessing(&desired_tree);
        tracing::debug!("Configuration after preprocessing: {}", desired_tree);
        let desired = PathIndex::from_tree(&desired_tree);

        let mut report = SystemReport::new(system, document.source.clone());
        let mut current = PathIndex::from_tree(&self.read_live_state(ruleset)?);

        loop {
            report.passes += 1;
            if let Some(max) = self.options.max_passes
                && report.passes > max
            {
                return Err(Error::PassLimitExceeded {
                    system: system.to_string(),
                    source_name: document.source.clone(),
                    passes: max,
                });
            }

            let diffs = compute_difference(&desired, &current);
            for diff in &diffs {
                tracing::debug!("Diff: {}", diff);
            }

            let outcome = apply_rules(ruleset, &diffs, &desired, &mut self.executor, self.options.noop)?;
            report.executed += outcome.executed;
            report.scripts.extend(outcome.scripts);

            if !outcome.refresh_requested {
                let report = report.finish(outcome.unresolved);
                tracing::info!(
                    passes = report.passes,
                    executed = report.executed,
                    "Finished {} ({:?})",
                    system,
                    report.status
                );
                return Ok(report);
            }

            report.refreshes += 1;
            if self.options.noop {
                tracing::debug!(
                    "[noop] Assuming {} resolved diff(s) were applied",
                    outcome.resolved.len()
                );
                for diff in &outcome.resolved {
                    current.apply(diff);
                }
            } else {
                current = PathIndex::from_tree(&self.read_live_state(ruleset)?);
            }
        }
    }

    /// Query live state, root it at the system name, preprocess it
    fn read_live_state(&mut self, ruleset: &RuleSet) -> Result<ValueTree> {
        let system = ruleset.name();
        let query = ruleset.query();
        tracing::debug!("Reading current status of {}", system);

        let snapshot = self
            .executor
            .query(&query.expr, query.postprocess)?
            .pop()
            .unwrap_or_else(ValueTree::undefined);

        let rooted = if snapshot.is_undefined() {
            ValueTree::empty_mapping()
        } else {
            let mut root = Mapping::new();
            root.insert(system.to_string(), snapshot);
            ValueTree::Mapping(root)
        };

        let live = ruleset.apply_server_preprocessing(&rooted);
        tracing::debug!("Live state after preprocessing: {}", live);
        Ok(live)
    }
}
