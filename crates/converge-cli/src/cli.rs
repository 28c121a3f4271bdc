//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;

use converge_core::config::{RulesSettings, RunSettings, Settings, TargetSettings};

/// converge - Drive a managed server's configuration to a desired state
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Desired-state documents (JSON or YAML), applied in order
    pub files: Vec<PathBuf>,

    /// Management CLI to run commands with
    #[arg(long, value_name = "PATH")]
    pub cli: Option<PathBuf>,

    /// Controller address passed to the management CLI
    #[arg(long, value_name = "ADDR", env = "CONVERGE_CONTROLLER")]
    pub controller: Option<String>,

    /// User for the management connection
    #[arg(long)]
    pub user: Option<String>,

    /// Password for the management connection
    #[arg(long, env = "CONVERGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory holding the rule bundles
    #[arg(long, value_name = "DIR")]
    pub ruledir: Option<PathBuf>,

    /// Print the remediation scripts without running them
    #[arg(long)]
    pub noop: bool,

    /// Give up on a system after this many diff passes
    #[arg(long, value_name = "N", value_parser = parse_max_passes)]
    pub max_passes: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Write log output to a file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Settings file to use instead of ./converge.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the global settings file
    #[arg(long, value_name = "DIR", env = "CONVERGE_CONFIG_DIR", hide = true)]
    pub global_config_dir: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_max_passes(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    /// The settings layer given on the command line
    pub fn overrides(&self) -> Settings {
        Settings {
            target: TargetSettings {
                cli: self.cli.clone(),
                controller: self.controller.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
                extra_args: Vec::new(),
            },
            rules: RulesSettings {
                dir: self.ruledir.clone(),
            },
            run: RunSettings {
                noop: self.noop.then_some(true),
                max_passes: self.max_passes,
            },
        }
    }
}
