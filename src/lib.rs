//! backtidy - A backup thinning utility
//!
//! This library finds periodically produced backup files in watched
//! directories, decides which of them are still worth keeping by age, and
//! moves the survivors into `recent`, `last-month` and per-year archive
//! directories while deleting or quarantining the rest.

pub mod archiver;
pub mod categorizer;
pub mod cli;
pub mod config;
pub mod date_extractor;
pub mod discovery;
pub mod logging;
pub mod orchestrator;
pub mod output;

pub use archiver::{ArchiveError, Archiver, Operation};
pub use categorizer::{Bucket, CategorizedFiles, categorize, categorize_group};
pub use config::{Config, ConfigError, InputDir, PatternSyntax};
pub use discovery::{DiscoveryError, FileDescriptor, PatternGroup, discover};
pub use orchestrator::{OrganizeError, RunOptions, RunReport, organize};

pub use cli::{Cli, run_cli};
