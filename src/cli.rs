//! Command-line interface module for backtidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading, overrides and validation
//! - Running the organizer once with a fixed clock
//! - Presenting the run report as tables or JSON

use crate::config::{Config, ConfigError};
use crate::orchestrator::{OrganizeError, RunOptions, RunReport, organize};
use crate::output::OutputFormatter;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Backup files organizer.
///
/// Sorts periodically produced backup files (database dumps and the like)
/// into recent, last-month and per-year archive directories, keeping one
/// file per day for the last month and one file per month before that.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "backtidy", version)]
pub struct Cli {
    /// Configuration file (default: ./.backtidyrc.toml, then ~/.config/backtidy/config.toml, then ~/.backtidy.toml).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show what would be deleted and moved without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    /// Override the configured archive directory name.
    #[arg(long, value_name = "NAME")]
    pub output_dir: Option<String>,

    /// Quarantine garbage in every input directory instead of deleting it.
    #[arg(long)]
    pub quarantine: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("Failed to render report: {0}")]
    Json(#[from] serde_json::Error),
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if self.quarantine {
            for dir in &mut config.input_dirs {
                dir.quarantine_garbage = true;
            }
        }
    }
}

/// Loads, overrides and validates the configuration for this invocation.
///
/// Every configured input directory must exist before any of them is touched.
pub fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    config.check_directories_exist()?;
    Ok(config)
}

/// Runs the organizer once and prints its report.
///
/// The clock is read a single time so every age in the run is measured from
/// the same instant.
pub fn run_cli(cli: &Cli, config: &Config) -> Result<RunReport, CliError> {
    let now = Local::now().naive_local();
    let options = RunOptions {
        dry_run: cli.dry_run,
        show_progress: !cli.json,
    };

    if !cli.json {
        let mode = if cli.dry_run { "Analyzing" } else { "Organizing" };
        for dir in &config.input_dirs {
            OutputFormatter::info(&format!("{} backups in: {}", mode, dir.path.display()));
        }
    }

    let report = organize(config, now, options)?;

    if cli.json {
        println!("{}", render_json(&report)?);
    } else {
        OutputFormatter::run_summary(&report);
        if cli.dry_run {
            println!("\nRun without --dry-run to apply these changes.");
        } else {
            OutputFormatter::success("Organization complete!");
        }
    }

    Ok(report)
}

/// Serializes a run report for `--json` output.
pub fn render_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
