//! Runs the discovery, categorization and archival pipeline over every
//! configured input directory.
//!
//! Directories are processed one after another. The first error stops the
//! whole run; changes already made in earlier directories, or in earlier
//! buckets of the failing one, are kept.

use crate::archiver::{ArchiveError, Archiver, Operation};
use crate::categorizer::{BinCounts, GroupSummary, categorize};
use crate::config::{Config, InputDir};
use crate::discovery::{DiscoveryError, discover};
use crate::output::OutputFormatter;
use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Errors that stop an organize run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Error discovering files in {}: {source}", .dir.display())]
    Discovery {
        dir: PathBuf,
        source: DiscoveryError,
    },

    #[error("Error archiving files in {}: {source}", .dir.display())]
    Archive { dir: PathBuf, source: ArchiveError },
}

/// Switches that change how a run behaves without changing its decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Plan every operation but leave the filesystem untouched.
    pub dry_run: bool,
    /// Draw a progress bar while files are being moved.
    pub show_progress: bool,
}

/// Outcome of organizing one input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub path: PathBuf,
    pub archive_dir: PathBuf,
    pub groups: Vec<GroupSummary>,
    pub totals: BinCounts,
    /// Operations performed, or planned during a dry run.
    pub operations: Vec<Operation>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// The instant all ages in this run were measured from.
    pub now: NaiveDateTime,
    pub dry_run: bool,
    pub directories: Vec<DirectoryReport>,
}

/// Organizes every input directory of `config`, measuring ages from `now`.
pub fn organize(
    config: &Config,
    now: NaiveDateTime,
    options: RunOptions,
) -> Result<RunReport, OrganizeError> {
    let directories = config
        .input_dirs
        .iter()
        .map(|dir| organize_dir(dir, &config.output_dir, now, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RunReport {
        now,
        dry_run: options.dry_run,
        directories,
    })
}

/// Runs the pipeline for a single input directory.
pub fn organize_dir(
    dir: &InputDir,
    output_dir: &str,
    now: NaiveDateTime,
    options: RunOptions,
) -> Result<DirectoryReport, OrganizeError> {
    info!("processing directory {}", dir.path.display());

    let groups = discover(dir, now.year()).map_err(|source| OrganizeError::Discovery {
        dir: dir.path.clone(),
        source,
    })?;

    let categorization = categorize(groups, now);

    let mut archiver = Archiver::new(&dir.path, output_dir, dir.quarantine_garbage);
    if options.show_progress && !options.dry_run {
        archiver = archiver.with_progress(OutputFormatter::create_progress_bar(0));
    }

    let result = if options.dry_run {
        archiver.plan(&categorization.bins)
    } else {
        archiver.archive(&categorization.bins)
    };
    let operations = result.map_err(|source| OrganizeError::Archive {
        dir: dir.path.clone(),
        source,
    })?;

    Ok(DirectoryReport {
        path: dir.path.clone(),
        archive_dir: archiver.archive_dir().to_path_buf(),
        totals: BinCounts::from_bins(&categorization.bins),
        groups: categorization.groups,
        operations,
    })
}
