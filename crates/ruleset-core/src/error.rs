//! Error types for ruleset-core

use std::path::PathBuf;

use crate::lookup::LookupUnavailable;

/// Result type for ruleset-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ruleset-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ruleset directory does not exist or cannot be enumerated
    #[error("Ruleset directory not found at {path}")]
    RulesetRootMissing { path: PathBuf },

    /// A single ruleset file could not be read or written
    #[error("I/O failure on ruleset {ruleset}: {source}")]
    IoFailure {
        ruleset: String,
        #[source]
        source: ruleset_fs::Error,
    },

    /// Eligibility could not be confirmed
    #[error(transparent)]
    LookupUnavailable(#[from] LookupUnavailable),

    /// Configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem error from ruleset-fs
    #[error(transparent)]
    Fs(#[from] ruleset_fs::Error),
}

impl Error {
    pub fn io_failure(ruleset: impl Into<String>, source: ruleset_fs::Error) -> Self {
        Self::IoFailure {
            ruleset: ruleset.into(),
            source,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Name of the ruleset a per-ruleset failure belongs to.
    pub fn ruleset(&self) -> Option<&str> {
        match self {
            Self::IoFailure { ruleset, .. } => Some(ruleset),
            _ => None,
        }
    }
}
