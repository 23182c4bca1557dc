//! Availability rule
//!
//! A rule reference is eligible iff its repository exists and carries a tag
//! named exactly like the required tag (`v0` by default).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{LookupCache, RepoState};
use crate::lookup::{LookupUnavailable, RepositoryLookup};

/// Tag a rule repository must carry to stay listed.
pub const DEFAULT_REQUIRED_TAG: &str = "v0";

/// Why a reference was judged ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IneligibleReason {
    RepoMissing,
    TagMissing,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IneligibleReason::RepoMissing => f.write_str("repo-missing"),
            IneligibleReason::TagMissing => f.write_str("tag-missing"),
        }
    }
}

/// Outcome of a definitive availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Ineligible(IneligibleReason),
}

/// Whether `name` can name a repository at all.
///
/// Names with whitespace or path separators, and names starting with `.`
/// or `_`, are never rule repositories, so they are settled without asking
/// the hosting platform.
pub fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(['.', '_'])
        && !name.chars().any(|c| c.is_whitespace() || c == '/')
}

/// Applies the availability rule through a [`RepositoryLookup`].
#[derive(Clone)]
pub struct AvailabilityChecker {
    lookup: Arc<dyn RepositoryLookup>,
    cache: Arc<LookupCache>,
    required_tag: String,
}

impl AvailabilityChecker {
    pub fn new(lookup: Arc<dyn RepositoryLookup>, cache: Arc<LookupCache>) -> Self {
        Self {
            lookup,
            cache,
            required_tag: DEFAULT_REQUIRED_TAG.to_string(),
        }
    }

    pub fn with_required_tag(mut self, tag: impl Into<String>) -> Self {
        self.required_tag = tag.into();
        self
    }

    pub fn required_tag(&self) -> &str {
        &self.required_tag
    }

    /// Check one reference.
    ///
    /// # Errors
    ///
    /// [`LookupUnavailable`] when the lookup gave up on a transient failure.
    /// This is never a reason to remove the reference.
    pub async fn check(&self, name: &str) -> Result<Verdict, LookupUnavailable> {
        if !is_valid_repo_name(name) {
            tracing::debug!(reference = name, "not a repository name");
            return Ok(Verdict::Ineligible(IneligibleReason::RepoMissing));
        }

        let state = self.cache.get_or_fetch(name, || self.fetch(name)).await?;
        let verdict = match state {
            RepoState::Missing => Verdict::Ineligible(IneligibleReason::RepoMissing),
            ref present if present.has_tag(&self.required_tag) => Verdict::Eligible,
            RepoState::Present { .. } => Verdict::Ineligible(IneligibleReason::TagMissing),
        };

        tracing::debug!(reference = name, ?verdict, "checked");
        Ok(verdict)
    }

    async fn fetch(&self, name: &str) -> Result<RepoState, LookupUnavailable> {
        if !self.lookup.exists(name).await? {
            return Ok(RepoState::Missing);
        }
        let tags = self.lookup.list_tags(name).await?;
        Ok(RepoState::Present { tags })
    }
}

impl fmt::Debug for AvailabilityChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityChecker")
            .field("required_tag", &self.required_tag)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
