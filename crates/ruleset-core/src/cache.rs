//! Per-pass lookup cache
//!
//! Rulesets often share rule repositories. The cache makes each repository
//! cost one round of lookups per pass, even when several checks for it are
//! in flight at once. Only definitive answers are stored; a failed fetch
//! leaves the slot empty so a later check tries again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::lookup::LookupUnavailable;

/// What the hosting platform said about a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoState {
    Missing,
    Present { tags: Vec<String> },
}

impl RepoState {
    pub fn has_tag(&self, tag: &str) -> bool {
        match self {
            RepoState::Missing => false,
            RepoState::Present { tags } => tags.iter().any(|t| t == tag),
        }
    }
}

/// Repository → state map scoped to one sync pass.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<RepoState>>>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached state for `name`, running `fetch` on a miss.
    ///
    /// Concurrent callers for the same name wait for a single fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        name: &str,
        fetch: F,
    ) -> Result<RepoState, LookupUnavailable>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RepoState, LookupUnavailable>>,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(name.to_string()).or_default())
        };

        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Cached state without fetching.
    pub fn get(&self, name: &str) -> Option<RepoState> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).and_then(|cell| cell.get().cloned())
    }

    /// Number of repositories with a definitive answer.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
