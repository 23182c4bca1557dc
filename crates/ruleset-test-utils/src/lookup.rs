//! In-memory [`RepositoryLookup`] for engine and checker tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ruleset_core::{LookupUnavailable, RepositoryLookup};

#[derive(Debug, Clone)]
enum FakeRepo {
    Present(Vec<String>),
    Unavailable(String),
}

/// A hosting platform held in memory.
///
/// Repositories not registered are reported missing. Every call is counted
/// per repository so tests can assert on caching.
///
/// ```rust
/// use ruleset_test_utils::FakeLookup;
///
/// let lookup = FakeLookup::new()
///     .with_repo("A", &["v0", "v1"])
///     .with_repo("B", &[])
///     .with_unavailable("D", "rate limited");
/// ```
#[derive(Debug, Default)]
pub struct FakeLookup {
    repos: Mutex<HashMap<String, FakeRepo>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing repository with the given tags.
    pub fn with_repo(self, name: &str, tags: &[&str]) -> Self {
        self.set_repo(name, tags);
        self
    }

    /// Make every lookup of `name` fail as unavailable.
    pub fn with_unavailable(self, name: &str, reason: &str) -> Self {
        self.set_unavailable(name, reason);
        self
    }

    /// Change a repository's tags, simulating an external state change.
    pub fn set_repo(&self, name: &str, tags: &[&str]) {
        self.repos().insert(
            name.to_string(),
            FakeRepo::Present(tags.iter().map(|t| t.to_string()).collect()),
        );
    }

    pub fn set_unavailable(&self, name: &str, reason: &str) {
        self.repos()
            .insert(name.to_string(), FakeRepo::Unavailable(reason.to_string()));
    }

    /// Calls (of either kind) made for `name`.
    pub fn calls_for(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn repos(&self) -> std::sync::MutexGuard<'_, HashMap<String, FakeRepo>> {
        self.repos.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, name: &str) -> Option<FakeRepo> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default() += 1;
        self.repos().get(name).cloned()
    }
}

#[async_trait]
impl RepositoryLookup for FakeLookup {
    async fn exists(&self, name: &str) -> Result<bool, LookupUnavailable> {
        match self.record(name) {
            None => Ok(false),
            Some(FakeRepo::Present(_)) => Ok(true),
            Some(FakeRepo::Unavailable(reason)) => Err(LookupUnavailable::new(name, reason)),
        }
    }

    async fn list_tags(&self, name: &str) -> Result<Vec<String>, LookupUnavailable> {
        match self.record(name) {
            None => Ok(Vec::new()),
            Some(FakeRepo::Present(tags)) => Ok(tags),
            Some(FakeRepo::Unavailable(reason)) => Err(LookupUnavailable::new(name, reason)),
        }
    }
}
