//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the progress bar shown while files are relocated, and the per-directory
//! summary tables.

use crate::archiver::Operation;
use crate::orchestrator::{DirectoryReport, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use backtidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the summary of a whole run.
    pub fn run_summary(report: &RunReport) {
        if report.dry_run {
            Self::dry_run_notice(&format!(
                "Ages measured from {}; no files were modified.",
                report.now.format("%Y-%m-%d %H:%M")
            ));
        }
        for directory in &report.directories {
            Self::directory_summary(directory);
            if report.dry_run {
                Self::planned_operations(&directory.operations);
            }
        }
    }

    /// Prints one table row per pattern group, followed by the directory total.
    pub fn directory_summary(report: &DirectoryReport) {
        Self::header(&report.path.display().to_string());

        let width = report
            .groups
            .iter()
            .map(|g| g.pattern.len() + 2)
            .max()
            .unwrap_or(0)
            .max(7);

        println!(
            "{:<width$} | {:>7} | {:>7} | {:>6} | {:>10} | {:>5}",
            "Pattern".bold(),
            "Matched".bold(),
            "Garbage".bold(),
            "Recent".bold(),
            "Last month".bold(),
            "Years".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 52));

        for group in &report.groups {
            let counts = &group.counts;
            println!(
                "{:<width$} | {:>7} | {:>7} | {:>6} | {:>10} | {:>5}",
                format!("/{}/", group.pattern),
                counts.matched,
                counts.garbage.to_string().red(),
                counts.recent.to_string().green(),
                counts.last_month.to_string().green(),
                counts.years_total().to_string().green(),
                width = width
            );
        }

        let totals = &report.totals;
        println!("{}", "-".repeat(width + 52));
        println!(
            "{:<width$} | {:>7} | {:>7} | {:>6} | {:>10} | {:>5}",
            "Total".bold(),
            totals.matched.to_string().bold(),
            totals.garbage.to_string().red().bold(),
            totals.recent.to_string().green().bold(),
            totals.last_month.to_string().green().bold(),
            totals.years_total().to_string().green().bold(),
            width = width
        );

        if !totals.years.is_empty() {
            let years = totals
                .years
                .iter()
                .map(|(year, count)| format!("{year}: {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            println!("Kept per year: {}", years);
        }
    }

    /// Lists the operations a dry run would perform.
    pub fn planned_operations(operations: &[Operation]) {
        if operations.is_empty() {
            println!("Nothing to do; the archive is already organized.");
            return;
        }
        for operation in operations {
            match operation {
                Operation::CreateDir { path } => {
                    println!("   + would create {}/", path.display())
                }
                Operation::Delete { path } => {
                    println!("   {} would delete {}", "✗".red(), path.display())
                }
                Operation::Move {
                    original_path,
                    new_path,
                    ..
                } => println!(
                    "   → would move {} to {}",
                    original_path.display(),
                    new_path.display()
                ),
            }
        }
    }
}
