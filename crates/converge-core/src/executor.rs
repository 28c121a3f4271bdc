//! The boundary to the managed target
//!
//! Every live-state query and every remediation goes through a
//! [`CommandExecutor`]. Calls are blocking and one at a time; later
//! remediations may depend on the side effects of earlier ones.

use converge_model::ValueTree;
use converge_rules::ResultPostprocessor;

use crate::Result;

/// Executes queries and scripts against the managed target
pub trait CommandExecutor {
    /// Run a live-state query; the last response is the snapshot
    fn query(&mut self, expr: &str, postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>>;

    /// Run remediation script lines in order
    fn run(&mut self, lines: &[String], postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &mut E {
    fn query(&mut self, expr: &str, postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        (**self).query(expr, postprocess)
    }

    fn run(&mut self, lines: &[String], postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        (**self).run(lines, postprocess)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn query(&mut self, expr: &str, postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        (**self).query(expr, postprocess)
    }

    fn run(&mut self, lines: &[String], postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        (**self).run(lines, postprocess)
    }
}

/// Apply a postprocessor, reporting failure as a command error
pub fn postprocess_responses(
    command: &str,
    postprocess: ResultPostprocessor,
    responses: Vec<ValueTree>,
) -> Result<Vec<ValueTree>> {
    postprocess
        .apply(responses)
        .map_err(|e| crate::Error::command(command, e.to_string()))
}
