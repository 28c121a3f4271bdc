//! Convergence engine for converge
//!
//! Drives desired state onto a managed target: query live state, diff it
//! against the desired documents, run the matching remediation rules and
//! repeat until no rule asks for a refresh.
//!
//! # Modules
//!
//! - [`controller`]: the [`Reconciler`] loop over systems and documents
//! - [`apply`]: one pass of rule application
//! - [`executor`]: the [`CommandExecutor`] boundary
//! - [`process`]: [`CliExecutor`], the external-CLI executor
//! - [`report`]: serializable run reports
//! - [`config`]: layered [`Settings`]

pub mod apply;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod process;
pub mod report;

pub use apply::{ExecutedScript, RuleOutcome, apply_rules};
pub use config::{Settings, SettingsResolver};
pub use controller::{Reconciler, RunOptions};
pub use error::{Error, Result};
pub use executor::CommandExecutor;
pub use process::{CliExecutor, CliTarget};
pub use report::{ConvergenceStatus, RunReport, SystemReport};
