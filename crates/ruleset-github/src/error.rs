//! Error types for the GitHub client

use std::time::Duration;

/// Result type for client construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a [`GitHubClient`](crate::GitHubClient)
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid API base URL '{url}': {message}")]
    InvalidApiBase { url: String, message: String },

    #[error("Token contains characters not allowed in a header")]
    InvalidToken,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outcome of a failed request, classified for retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Definitive absence (404)
    #[error("not found")]
    NotFound,

    /// Worth another attempt
    #[error("{reason}")]
    Transient {
        reason: String,
        retry_after: Option<Duration>,
    },

    /// Retrying will not help
    #[error("{reason}")]
    Permanent { reason: String },
}

impl RequestError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent {
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
