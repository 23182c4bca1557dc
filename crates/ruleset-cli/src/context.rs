//! Resolved settings for one invocation
//!
//! Combines the repository root, the optional config file, command-line
//! overrides and the API token from the environment.

use std::path::Path;
use std::sync::Arc;

use ruleset_core::{
    AvailabilityChecker, LookupCache, RulesetStore, SyncConfig, SyncEngine, SyncOptions,
};
use ruleset_fs::NormalizedPath;
use ruleset_github::GitHubClient;

use crate::cli::GlobalArgs;
use crate::error::{CliError, Result};

/// Environment variables checked for an API token, in order.
pub const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

#[derive(Debug, Clone)]
pub struct Context {
    pub root: NormalizedPath,
    pub config: SyncConfig,
    token: Option<String>,
}

impl Context {
    /// Resolve against the process environment.
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_with(args, &cwd, |var| std::env::var(var).ok())
    }

    pub fn resolve_with(
        args: &GlobalArgs,
        cwd: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let requested = args.root.as_deref().unwrap_or(cwd);
        let root = dunce::canonicalize(requested).map_err(|e| {
            CliError::user(format!(
                "Repository root {} is not accessible: {}",
                requested.display(),
                e
            ))
        })?;
        let root = NormalizedPath::new(root);

        let mut config = match &args.config {
            Some(path) => SyncConfig::load_from(&NormalizedPath::new(path))?,
            None => SyncConfig::load(&root)?,
        };
        if let Some(org) = &args.org {
            config.organization = org.clone();
        }
        if let Some(api_base) = &args.api_base {
            config.lookup.api_base = api_base.clone();
        }
        if let Some(concurrency) = args.concurrency {
            config.concurrency = concurrency;
        }
        let config = config.validated()?;

        let token = TOKEN_VARS
            .iter()
            .filter_map(|var| env(var))
            .find(|value| !value.trim().is_empty());

        Ok(Self {
            root,
            config,
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn rulesets_root(&self) -> NormalizedPath {
        self.config.rulesets_root(&self.root)
    }

    pub fn store(&self) -> RulesetStore {
        RulesetStore::new(self.rulesets_root()).with_extension(self.config.extension.as_str())
    }

    /// Engine wired to the GitHub API with a fresh per-pass cache.
    pub fn engine(&self, dry_run: bool) -> Result<SyncEngine> {
        if self.token.is_none() {
            tracing::warn!(
                "neither GITHUB_TOKEN nor GH_TOKEN is set; running unauthenticated with a low rate limit"
            );
        }
        let client = GitHubClient::new(
            self.config.organization.as_str(),
            &self.config.lookup,
            self.token.as_deref(),
        )?;
        let checker = AvailabilityChecker::new(Arc::new(client), Arc::new(LookupCache::new()))
            .with_required_tag(self.config.required_tag.as_str());

        Ok(SyncEngine::new(self.store(), checker).with_options(SyncOptions {
            dry_run,
            concurrency: self.config.concurrency,
        }))
    }
}
