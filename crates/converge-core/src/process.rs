//! Command execution through an external management CLI
//!
//! Each call writes its command lines to a temporary script file and runs
//!
//! ```text
//! <cli> --connect [--controller=<addr>] [--user=<u> --password=<p>] <extra args> --file=<script>
//! ```
//!
//! Standard output is read as a stream of JSON documents, one response per
//! document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use converge_model::ValueTree;
use converge_rules::ResultPostprocessor;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, postprocess_responses};

/// Connection settings for the management CLI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliTarget {
    pub cli: PathBuf,
    pub controller: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub extra_args: Vec<String>,
}

impl CliTarget {
    pub fn new(cli: impl Into<PathBuf>) -> Self {
        Self {
            cli: cli.into(),
            ..Self::default()
        }
    }

    /// Arguments for one invocation against `script`
    pub fn args(&self, script: &Path) -> Vec<String> {
        let mut args = vec!["--connect".to_string()];
        if let Some(controller) = &self.controller {
            args.push(format!("--controller={}", controller));
        }
        if let Some(user) = &self.user {
            args.push(format!("--user={}", user));
            if let Some(password) = &self.password {
                args.push(format!("--password={}", password));
            }
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(format!("--file={}", script.display()));
        args
    }
}

/// [`CommandExecutor`] that shells out to the management CLI
#[derive(Debug, Clone)]
pub struct CliExecutor {
    target: CliTarget,
}

impl CliExecutor {
    pub fn new(target: CliTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &CliTarget {
        &self.target
    }

    fn execute(&self, lines: &[String]) -> Result<Vec<ValueTree>> {
        let command = lines.join("; ");

        let mut script = NamedTempFile::new()?;
        for line in lines {
            writeln!(script, "{}", line)?;
        }
        script.flush()?;

        let args = self.target.args(script.path());
        tracing::debug!(
            cli = %self.target.cli.display(),
            controller = ?self.target.controller,
            "Running {}",
            command
        );

        let output = Command::new(&self.target.cli)
            .args(&args)
            .output()
            .map_err(|e| {
                Error::command(
                    &command,
                    format!("cannot start {}: {}", self.target.cli.display(), e),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let stderr_snippet = stderr.trim();
            let message = if stderr_snippet.is_empty() {
                format!("exited with non-zero status (exit code: {:?})", output.status.code())
            } else {
                format!(
                    "exited with non-zero status (exit code: {:?}): {}",
                    output.status.code(),
                    stderr_snippet
                )
            };
            return Err(Error::command(command, message));
        }

        parse_responses(&command, &stdout)
    }
}

impl CommandExecutor for CliExecutor {
    fn query(&mut self, expr: &str, postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        let responses = self.execute(&[expr.to_string()])?;
        postprocess_responses(expr, postprocess, responses)
    }

    fn run(&mut self, lines: &[String], postprocess: ResultPostprocessor) -> Result<Vec<ValueTree>> {
        let responses = self.execute(lines)?;
        postprocess_responses(&lines.join("; "), postprocess, responses)
    }
}

/// Parse CLI output as consecutive JSON documents
pub fn parse_responses(command: &str, stdout: &str) -> Result<Vec<ValueTree>> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<serde_json::Value>()
        .map(|item| {
            item.map(ValueTree::from_json)
                .map_err(|e| Error::command(command, format!("unparsable output: {}", e)))
        })
        .collect()
}
