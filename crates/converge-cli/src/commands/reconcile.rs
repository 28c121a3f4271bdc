//! The reconcile command
//!
//! Resolves settings, loads the rule catalog and the input documents, then
//! runs the convergence loop against the configured management CLI.

use std::path::PathBuf;

use colored::Colorize;

use converge_core::{CliExecutor, Reconciler, RunReport, SettingsResolver, SystemReport};
use converge_model::{InputDocument, load_document};
use converge_rules::{DirRuleAccessor, RuleCatalog};

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub fn run_reconcile(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut resolver = SettingsResolver::new(&cwd);
    if let Some(config) = &cli.config {
        if !config.is_file() {
            return Err(CliError::user(format!(
                "Settings file not found: {}",
                config.display()
            )));
        }
        resolver = resolver.with_project_file(config);
    }
    if let Some(dir) = &cli.global_config_dir {
        resolver = resolver.with_global_config_dir(dir);
    }
    let settings = resolver.resolve(&cli.overrides())?;

    let ruledir = settings.rules.dir.clone().ok_or_else(|| {
        CliError::user("No rule directory. Pass --ruledir or set [rules] dir in converge.toml")
    })?;
    let catalog = RuleCatalog::load(&DirRuleAccessor::new(&ruledir))?;

    if cli.files.is_empty() {
        if !cli.json {
            println!(
                "{} Rules in {} are valid: {}",
                "OK".green().bold(),
                ruledir.display(),
                catalog.system_names().collect::<Vec<_>>().join(", ")
            );
        }
        return Ok(());
    }

    let documents = load_documents(&cli.files)?;
    let options = settings.run_options();
    let executor = CliExecutor::new(settings.cli_target());
    let mut reconciler = Reconciler::new(&catalog, executor, options);

    if !cli.json {
        let prefix = if options.noop { "[noop] " } else { "" };
        println!(
            "{} {}Reconciling {} document(s)...",
            "=>".blue().bold(),
            prefix,
            documents.len()
        );
    }

    let report = reconciler.run(&documents)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn load_documents(files: &[PathBuf]) -> Result<Vec<InputDocument>> {
    files
        .iter()
        .map(|file| load_document(file).map_err(CliError::from))
        .collect()
}

fn print_summary(report: &RunReport) {
    for system in &report.systems {
        print_system(system);
    }

    println!();
    if report.has_warnings() {
        println!(
            "{} Finished with unresolved diffs ({} rule(s) applied).",
            "WARN".yellow().bold(),
            report.executed()
        );
    } else {
        println!(
            "{} Converged ({} rule(s) applied).",
            "OK".green().bold(),
            report.executed()
        );
    }
}

fn print_system(system: &SystemReport) {
    let label = format!("{} ({})", system.system, system.source);
    let passes = if system.passes == 1 { "pass" } else { "passes" };

    if system.has_warnings() {
        println!(
            "{} {}: {} unresolved diff(s) after {} {}",
            "WARN".yellow().bold(),
            label.cyan(),
            system.unresolved.len(),
            system.passes,
            passes
        );
        for diff in &system.unresolved {
            println!("   {} {}", "-".yellow(), diff);
        }
    } else {
        println!(
            "{} {}: converged in {} {}, {} rule(s) applied",
            "OK".green().bold(),
            label.cyan(),
            system.passes,
            passes,
            system.executed
        );
    }

    for script in &system.scripts {
        for line in &script.lines {
            println!("   {} {}", script.rule.dimmed(), line);
        }
    }
}
