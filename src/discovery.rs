//! Discovery of backup files under a watched directory.
//!
//! Walks an input directory recursively and sorts every regular file whose
//! name matches one of the configured patterns into that pattern's group.
//! Each match becomes a [`FileDescriptor`] carrying the date used for
//! bucketing.

use crate::config::{InputDir, PatternSyntax};
use crate::date_extractor::extract_date;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Errors that can occur while discovering files.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A configured regex pattern failed to compile.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    /// A configured glob pattern failed to compile.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    /// The directory tree could not be walked.
    #[error("Failed to walk directory: {0}")]
    Traversal(#[from] walkdir::Error),

    /// A matched file's modification time is unavailable.
    #[error("Failed to read modification time of {}: {source}", .path.display())]
    ModificationTime {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A backup file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Location of the file when it was discovered.
    pub path: PathBuf,
    /// Date used for bucketing: from the file name if present, else the
    /// modification date.
    pub sorting_date: NaiveDate,
    /// Local modification time, the tie-breaker between equal sorting dates.
    pub modified: NaiveDateTime,
}

impl FileDescriptor {
    /// Builds a descriptor, falling back to the modification date when the
    /// file name carries no usable date.
    pub fn new(path: PathBuf, name_date: Option<NaiveDate>, modified: NaiveDateTime) -> Self {
        Self {
            path,
            sorting_date: name_date.unwrap_or_else(|| modified.date()),
            modified,
        }
    }

    /// The file's base name, as used for matching and for relocation.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// All files matched by one configured pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternGroup {
    pub pattern: String,
    pub files: Vec<FileDescriptor>,
}

impl PatternGroup {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            files: Vec::new(),
        }
    }
}

/// A compiled file name pattern.
#[derive(Debug, Clone)]
pub enum FilePattern {
    Regex(Regex),
    Glob(glob::Pattern),
}

impl FilePattern {
    /// Compiles `pattern` under the given syntax.
    pub fn compile(pattern: &str, syntax: PatternSyntax) -> Result<Self, DiscoveryError> {
        match syntax {
            PatternSyntax::Regex => Regex::new(pattern).map(Self::Regex).map_err(|source| {
                DiscoveryError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                }
            }),
            PatternSyntax::Glob => glob::Pattern::new(pattern).map(Self::Glob).map_err(|source| {
                DiscoveryError::InvalidGlob {
                    pattern: pattern.to_string(),
                    source,
                }
            }),
        }
    }

    /// Regexes may match anywhere in the name; globs must match all of it.
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(file_name),
            Self::Glob(pattern) => pattern.matches(file_name),
        }
    }
}

/// Walks `dir` and groups every matching regular file by the first pattern it
/// matches, in configuration order.
///
/// The returned groups follow the order of `dir.patterns`; a pattern that
/// matched nothing yields an empty group. Any pattern compile error or
/// traversal error aborts the whole walk.
pub fn discover(dir: &InputDir, current_year: i32) -> Result<Vec<PatternGroup>, DiscoveryError> {
    let matchers = dir
        .patterns
        .iter()
        .map(|pattern| FilePattern::compile(pattern, dir.pattern_syntax))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: Vec<PatternGroup> = dir.patterns.iter().map(PatternGroup::new).collect();

    for entry in WalkDir::new(&dir.path) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(index) = matchers.iter().position(|m| m.matches(&file_name)) else {
            continue;
        };

        let modified = modification_time(entry.path(), &entry.metadata()?)?;
        let descriptor = FileDescriptor::new(
            entry.into_path(),
            extract_date(&file_name, current_year),
            modified,
        );
        debug!(
            path = %descriptor.path.display(),
            sorting_date = %descriptor.sorting_date,
            pattern = %groups[index].pattern,
            "matched backup file"
        );
        groups[index].files.push(descriptor);
    }

    Ok(groups)
}

fn modification_time(
    path: &Path,
    metadata: &std::fs::Metadata,
) -> Result<NaiveDateTime, DiscoveryError> {
    let modified = metadata
        .modified()
        .map_err(|source| DiscoveryError::ModificationTime {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}
