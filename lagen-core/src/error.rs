//! Error taxonomy
//!
//! Configuration errors abort the run before any entry is touched.
//! Validation and I/O errors fail a single entry. Dependency install
//! failures are only ever surfaced as warnings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Bad configuration file: {path} ({source})")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bad configuration file: {path} ({source})")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Project path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Entry name declared more than once: {0}")]
    DuplicateEntry(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("[{entry}] Invalid value for {kind} package manager: {found}, available are {allowed:?}")]
    InvalidPackageManager {
        entry: String,
        kind: String,
        found: String,
        allowed: Vec<String>,
    },

    #[error("[{entry}] Environment key {key} not in global environment")]
    MissingEnvironmentKey { entry: String, key: String },

    #[error("[{entry}] Missing value for placeholder {placeholder}")]
    UnresolvedPlaceholder { entry: String, placeholder: String },

    #[error("[{entry}] Rule {rule} depends on unknown rule {prerule}")]
    UnknownPrerule {
        entry: String,
        rule: String,
        prerule: String,
    },

    #[error("Invalid entry name {0:?}: must be a plain directory name")]
    InvalidEntryName(String),

    #[error("[{entry}] Invalid version {version}: {reason}")]
    InvalidVersion {
        entry: String,
        version: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown entry type: {0}")]
    UnknownKind(String),

    #[error("[{entry}] Unable to write {path}: {source}")]
    Io {
        entry: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GenerateError {
    pub fn io(entry: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            entry: entry.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Whether this error stops every remaining entry, not just its own.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownKind(_))
    }
}

/// Raised by the external install step. Never aborts an entry.
#[derive(Debug, Error)]
pub enum DependencyInstallError {
    #[error("[{entry}] `{command}` exited with {status}")]
    Failed {
        entry: String,
        command: String,
        status: String,
    },

    #[error("[{entry}] Unable to run `{command}`: {source}")]
    Spawn {
        entry: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}
