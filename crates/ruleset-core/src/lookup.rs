//! Repository lookup seam
//!
//! The hosting platform sits behind [`RepositoryLookup`] so the checker and
//! engine never see HTTP. Implementations retry transient failures
//! themselves and only surface [`LookupUnavailable`] once they give up.

use async_trait::async_trait;

/// Eligibility could not be confirmed for a repository.
///
/// Never a definitive "not found"; callers must keep the reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lookup unavailable for {repo}: {reason}")]
pub struct LookupUnavailable {
    pub repo: String,
    pub reason: String,
}

impl LookupUnavailable {
    pub fn new(repo: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            reason: reason.into(),
        }
    }
}

/// Read-only queries against the organization that hosts rule repositories.
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// Whether a usable repository with this name exists.
    async fn exists(&self, name: &str) -> Result<bool, LookupUnavailable>;

    /// All tag names of the repository.
    async fn list_tags(&self, name: &str) -> Result<Vec<String>, LookupUnavailable>;
}
