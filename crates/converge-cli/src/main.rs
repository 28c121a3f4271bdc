//! converge CLI
//!
//! Reconciles a managed server against desired-state documents using the
//! rule bundles in a rule directory.

mod cli;
mod commands;
mod error;

use std::fs::File;
use std::sync::Mutex;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::Cli;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    commands::run_reconcile(&cli)
}

/// Install the tracing subscriber: INFO by default, DEBUG with `-v`
///
/// `CONVERGE_LOG` accepts a full filter directive and wins over `-v`.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("CONVERGE_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let installed = match &cli.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                CliError::user(format!("Cannot open log output {}: {}", path.display(), e))
            })?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(cli.verbose)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(cli.verbose)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    installed.map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {}", e)))?;

    tracing::debug!("Verbose mode enabled");
    Ok(())
}
