//! Remediation rules for converge
//!
//! A rule bundle describes, per system, how to query live state, how to
//! normalise desired and live trees, and which script remediates each kind
//! of diff. Bundles are loaded once into an immutable [`RuleCatalog`].

pub mod accessor;
pub mod error;
pub mod postprocess;
pub mod rule;
pub mod ruleset;
pub mod script;
pub mod transform;

pub use accessor::{DirRuleAccessor, Properties, RuleAccessor};
pub use error::{Error, Result};
pub use postprocess::ResultPostprocessor;
pub use rule::MatchRule;
pub use ruleset::{QueryDescriptor, ROOT_BUNDLE, RuleCatalog, RuleSet};
pub use script::{ScriptContext, ScriptTemplate};
pub use transform::{Transform, apply_all};
