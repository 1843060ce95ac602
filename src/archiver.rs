//! Archive layout and file relocation.
//!
//! This module turns categorized bins into filesystem changes inside
//! `<input-dir>/<output-dir>/`: bucket directories are created, garbage is
//! deleted or quarantined, and surviving files are renamed into their bucket.
//! Work is first expressed as a list of `Operation`s so a dry run and a
//! real run describe exactly the same changes.

use crate::categorizer::{Bucket, CategorizedFiles};
use crate::discovery::FileDescriptor;
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while archiving files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A directory that should hold archived files is something else.
    #[error("{} exists, but is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Failed to inspect a target directory.
    #[error("Failed to inspect {}: {source}", .path.display())]
    InspectFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create a bucket directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to delete a garbage file.
    #[error("Failed to delete {}: {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Two files would end up at the same place, or the place is taken.
    #[error("Refusing to overwrite {} with {}", .to.display(), .from.display())]
    DestinationTaken { from: PathBuf, to: PathBuf },

    /// Failed to move a file to its bucket directory.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// A single filesystem change made (or planned) by the archiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Operation {
    /// Create a missing archive or bucket directory.
    CreateDir { path: PathBuf },
    /// Remove a garbage file outright.
    Delete { path: PathBuf },
    /// Rename a file into a bucket directory.
    Move {
        original_path: PathBuf,
        new_path: PathBuf,
        bucket: String,
    },
}

/// Relocates categorized files into the archive of one input directory.
pub struct Archiver {
    archive_dir: PathBuf,
    quarantine_garbage: bool,
    progress: ProgressBar,
}

impl Archiver {
    /// Creates an archiver writing to `<input_dir>/<output_dir>`.
    ///
    /// With `quarantine_garbage` set, garbage is moved to `delete-me/` inside
    /// the archive instead of being deleted.
    pub fn new(input_dir: &Path, output_dir: &str, quarantine_garbage: bool) -> Self {
        Self {
            archive_dir: input_dir.join(output_dir),
            quarantine_garbage,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports each executed operation on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Computes the operations that realize `bins`, without changing anything.
    ///
    /// Order: archive directory, garbage, recent, last-month, then each year
    /// in ascending order. Files already at their destination produce no
    /// operation, so planning an organized archive yields no moves.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::NotADirectory` if a target directory path is
    /// occupied by something other than a directory, and
    /// `ArchiveError::DestinationTaken` if a move would replace an existing
    /// file or a file moved earlier in the same plan.
    pub fn plan(&self, bins: &CategorizedFiles) -> ArchiveResult<Vec<Operation>> {
        let mut operations = Vec::new();
        plan_directory(&self.archive_dir, &mut operations)?;

        if self.quarantine_garbage {
            self.plan_bucket(Bucket::Garbage, &bins.garbage, &mut operations)?;
        } else {
            operations.extend(bins.garbage.iter().map(|file| Operation::Delete {
                path: file.path.clone(),
            }));
        }

        self.plan_bucket(Bucket::Recent, &bins.recent, &mut operations)?;
        self.plan_bucket(Bucket::LastMonth, &bins.last_month, &mut operations)?;
        for (year, files) in &bins.years {
            self.plan_bucket(Bucket::Year(*year), files, &mut operations)?;
        }

        Ok(operations)
    }

    /// Plans and executes the archival of `bins`.
    ///
    /// Stops at the first failing operation. Operations completed before the
    /// failure stay in effect.
    pub fn archive(&self, bins: &CategorizedFiles) -> ArchiveResult<Vec<Operation>> {
        let operations = self.plan(bins)?;

        self.progress.set_length(operations.len() as u64);
        for operation in &operations {
            execute(operation)?;
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        Ok(operations)
    }

    fn plan_bucket(
        &self,
        bucket: Bucket,
        files: &[FileDescriptor],
        operations: &mut Vec<Operation>,
    ) -> ArchiveResult<()> {
        let bucket_name = bucket.dir_name();
        let bucket_dir = self.archive_dir.join(&bucket_name);
        plan_directory(&bucket_dir, operations)?;

        for file in files {
            let new_path = bucket_dir.join(file.file_name());
            if new_path == file.path {
                continue;
            }
            let claimed = operations.iter().any(|op| {
                matches!(op, Operation::Move { new_path: taken, .. } if *taken == new_path)
            });
            if claimed || fs::symlink_metadata(&new_path).is_ok() {
                return Err(ArchiveError::DestinationTaken {
                    from: file.path.clone(),
                    to: new_path,
                });
            }
            operations.push(Operation::Move {
                original_path: file.path.clone(),
                new_path,
                bucket: bucket_name.clone(),
            });
        }
        Ok(())
    }
}

/// Adds a `CreateDir` for `path` unless it already is a directory.
fn plan_directory(path: &Path, operations: &mut Vec<Operation>) -> ArchiveResult<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ArchiveError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            operations.push(Operation::CreateDir {
                path: path.to_path_buf(),
            });
            Ok(())
        }
        Err(source) => Err(ArchiveError::InspectFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Performs one operation on the filesystem.
pub fn execute(operation: &Operation) -> ArchiveResult<()> {
    match operation {
        Operation::CreateDir { path } => {
            info!("creating {}", path.display());
            fs::create_dir_all(path).map_err(|source| ArchiveError::DirectoryCreationFailed {
                path: path.clone(),
                source,
            })?;
            if !path.is_dir() {
                return Err(ArchiveError::NotADirectory(path.clone()));
            }
        }
        Operation::Delete { path } => {
            debug!("deleting {}", path.display());
            fs::remove_file(path).map_err(|source| ArchiveError::DeleteFailed {
                path: path.clone(),
                source,
            })?;
        }
        Operation::Move {
            original_path,
            new_path,
            bucket,
        } => {
            debug!(bucket = %bucket, "moving {} to {}", original_path.display(), new_path.display());
            fs::rename(original_path, new_path).map_err(|source| {
                ArchiveError::FileMoveFailure {
                    from: original_path.clone(),
                    to: new_path.clone(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}
