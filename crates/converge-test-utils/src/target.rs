//! [`FakeTarget`]: an in-memory managed target.
//!
//! The live state is one tree keyed by system name. Queries and script lines
//! use a tiny command language:
//!
//! | command | effect |
//! |---|---|
//! | `get <system>` | query; responds with the system's subtree |
//! | `set <path> <text>` | store `<text>` as a string leaf at `<path>` |
//! | `remove <path>` | delete the node at `<path>` |
//! | `fail <message>` | respond with a failed outcome |
//! | `echo <text>` | succeed without changing state |
//!
//! Every response is an `{"outcome": ..., "result": ...}` envelope, so the
//! rule set's postprocessors see what a real management CLI would send.

use converge_core::executor::postprocess_responses;
use converge_core::{CommandExecutor, Error, Result};
use converge_model::{Mapping, Path, ValueTree};
use converge_rules::ResultPostprocessor;
use serde_json::json;

/// An in-memory [`CommandExecutor`] that records every command.
///
/// # Example
///
/// ```rust
/// use converge_core::CommandExecutor;
/// use converge_rules::ResultPostprocessor;
/// use converge_test_utils::FakeTarget;
/// use serde_json::json;
///
/// let mut target = FakeTarget::with_state(json!({"sub": {"a": "1"}}));
/// target.run(&["set sub/b 2".to_string()], ResultPostprocessor::Outcome).unwrap();
/// assert_eq!(target.state_json(), json!({"sub": {"a": "1", "b": "2"}}));
/// ```
#[derive(Debug, Clone)]
pub struct FakeTarget {
    state: ValueTree,
    history: Vec<String>,
    queries: usize,
    /// When set, `set` and `remove` succeed without changing state.
    pub frozen: bool,
}

impl Default for FakeTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTarget {
    /// A target with no configuration at all.
    pub fn new() -> Self {
        Self {
            state: ValueTree::empty_mapping(),
            history: Vec::new(),
            queries: 0,
            frozen: false,
        }
    }

    /// A target whose live state is `state` (an object keyed by system).
    pub fn with_state(state: serde_json::Value) -> Self {
        Self {
            state: ValueTree::from_json(state),
            ..Self::new()
        }
    }

    pub fn state(&self) -> &ValueTree {
        &self.state
    }

    pub fn state_json(&self) -> serde_json::Value {
        self.state.to_json()
    }

    /// Every query expression and script line, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Script lines only, in order.
    pub fn script_lines(&self) -> Vec<&str> {
        self.history
            .iter()
            .map(String::as_str)
            .filter(|line| !line.starts_with("get "))
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries
    }

    fn execute(&mut self, line: &str) -> Result<ValueTree> {
        self.history.push(line.to_string());
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));

        let response = match verb {
            "get" => {
                let result = self
                    .state
                    .get_key(rest.trim())
                    .cloned()
                    .unwrap_or_else(ValueTree::undefined);
                let mut envelope = Mapping::new();
                envelope.insert("outcome".to_string(), ValueTree::string("success"));
                envelope.insert("result".to_string(), result);
                ValueTree::Mapping(envelope)
            }
            "set" => {
                let (path, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let path = parse(line, path)?;
                if !self.frozen {
                    self.state
                        .set(&path, ValueTree::string(text))
                        .map_err(|e| Error::command(line, e.to_string()))?;
                }
                success()
            }
            "remove" => {
                let path = parse(line, rest.trim())?;
                if !self.frozen {
                    self.state.remove(&path);
                }
                success()
            }
            "fail" => ValueTree::from_json(json!({
                "outcome": "failed",
                "failure-description": rest,
            })),
            "echo" => success(),
            other => {
                return Err(Error::command(line, format!("unknown command '{}'", other)));
            }
        };
        Ok(response)
    }
}

fn success() -> ValueTree {
    ValueTree::from_json(json!({"outcome": "success"}))
}

fn parse(line: &str, path: &str) -> Result<Path> {
    path.parse::<Path>()
        .map_err(|e| Error::command(line, e.to_string()))
}

impl CommandExecutor for FakeTarget {
    fn query(&mut self, expr: &str, postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        self.queries += 1;
        let response = self.execute(expr)?;
        postprocess_responses(expr, postprocess, vec![response])
    }

    fn run(&mut self, lines: &[String], postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        let responses = lines
            .iter()
            .map(|line| self.execute(line))
            .collect::<Result<Vec<_>>>()?;
        postprocess_responses(&lines.join("; "), postprocess, responses)
    }
}
