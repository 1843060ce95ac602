//! Input-directory configuration.
//!
//! This module loads the list of watched backup directories from a TOML
//! file and validates it before any directory is touched.
//!
//! # Configuration File Format
//!
//! ```toml
//! output_dir = "archive"
//! log_file = "/var/log/backtidy.log"
//!
//! [[input_dirs]]
//! path = "/var/backups/postgres"
//! patterns = ['^pg-.*\.sql\.gz$']
//! quarantine_garbage = false
//!
//! [[input_dirs]]
//! path = "/var/backups/redis"
//! patterns = ["dump-*.rdb"]
//! pattern_syntax = "glob"
//! quarantine_garbage = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory config file looked up in the working directory.
pub const LOCAL_CONFIG_NAME: &str = ".backtidyrc.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// None of the default locations holds a configuration file.
    #[error(
        "No configuration file found; pass --config or create .backtidyrc.toml or ~/.config/backtidy/config.toml"
    )]
    NoConfigFile,

    /// The configuration file exists but could not be read.
    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration in {}: {source}", .path.display())]
    ConfigInvalid {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The configuration lists no input directories.
    #[error("input_dirs must have at least one entry")]
    NoInputDirs,

    /// An input directory entry lacks its path or its patterns.
    #[error("input_dirs[{index}] must have both path and patterns set")]
    IncompleteInputDir { index: usize },

    /// The output directory name is empty.
    #[error("output_dir must not be empty")]
    EmptyOutputDir,

    /// The output directory would not lie inside the input directories.
    #[error("output_dir '{0}' must be a relative path without '.' or '..' components")]
    OutputDirEscapesInput(String),

    /// A configured input directory does not exist.
    #[error("Directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    /// A configured input path exists but is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// How the patterns of an input directory are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSyntax {
    /// Regular expressions searched anywhere in the file name.
    #[default]
    Regex,
    /// Shell globs matched against the whole file name.
    Glob,
}

/// One watched directory and the backup files it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDir {
    /// Directory scanned recursively for backup files.
    pub path: PathBuf,

    /// File name patterns; each pattern forms its own group for thinning.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Move redundant files into `delete-me/` instead of deleting them.
    #[serde(default)]
    pub quarantine_garbage: bool,

    #[serde(default)]
    pub pattern_syntax: PatternSyntax,
}

impl InputDir {
    /// Creates a regex-pattern input directory that deletes its garbage.
    pub fn new(path: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            patterns,
            quarantine_garbage: false,
            pattern_syntax: PatternSyntax::Regex,
        }
    }
}

/// Complete tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Archive directory name, created inside every input directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Append log output to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub input_dirs: Vec<InputDir>,
}

fn default_output_dir() -> String {
    "archive".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_file: None,
            input_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.backtidyrc.toml` in the current directory
    /// 3. Look for `~/.config/backtidy/config.toml`
    /// 4. Look for `~/.backtidy.toml`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigFile` when no location holds a file, since
    /// a configuration without input directories has nothing to organize.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home = PathBuf::from(home);
            let candidates = [
                home.join(".config").join("backtidy").join("config.toml"),
                home.join(".backtidy.toml"),
            ];
            if let Some(found) = candidates.iter().find(|p| p.exists()) {
                return Self::load_from_file(found);
            }
        }

        Err(ConfigError::NoConfigFile)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Checks the structural rules every configuration must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_dirs.is_empty() {
            return Err(ConfigError::NoInputDirs);
        }

        for (index, dir) in self.input_dirs.iter().enumerate() {
            if dir.path.as_os_str().is_empty() || dir.patterns.is_empty() {
                return Err(ConfigError::IncompleteInputDir { index });
            }
        }

        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }

        let stays_inside = Path::new(&self.output_dir)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !stays_inside {
            return Err(ConfigError::OutputDirEscapesInput(self.output_dir.clone()));
        }

        Ok(())
    }

    /// Verifies that every configured input path is an existing directory.
    pub fn check_directories_exist(&self) -> Result<(), ConfigError> {
        for dir in &self.input_dirs {
            let metadata = fs::metadata(&dir.path)
                .map_err(|_| ConfigError::MissingDirectory(dir.path.clone()))?;
            if !metadata.is_dir() {
                return Err(ConfigError::NotADirectory(dir.path.clone()));
            }
        }
        Ok(())
    }
}
