//! Sync configuration
//!
//! Settings come from an optional `rulesets.toml` at the repository root
//! (any format [`ConfigStore`] understands), falling back to defaults for
//! every key. The CLI applies its flags on top.

use std::path::PathBuf;
use std::time::Duration;

use ruleset_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::availability::DEFAULT_REQUIRED_TAG;
use crate::{Error, Result};

/// Config file looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = "rulesets.toml";

/// Organization that hosts rule repositories.
pub const DEFAULT_ORGANIZATION: &str = "CursorCult";

/// Settings for one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Organization namespace every rule repository lives in
    pub organization: String,
    /// Directory holding ruleset files, relative to the repository root
    pub rulesets_dir: PathBuf,
    /// Extension of ruleset files, without the dot
    pub extension: String,
    /// Tag a rule repository must carry to stay listed
    pub required_tag: String,
    /// Maximum availability checks in flight
    pub concurrency: usize,
    /// Hosting-platform client settings
    pub lookup: LookupSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            organization: DEFAULT_ORGANIZATION.to_string(),
            rulesets_dir: PathBuf::from("rulesets"),
            extension: "txt".to_string(),
            required_tag: DEFAULT_REQUIRED_TAG.to_string(),
            concurrency: 8,
            lookup: LookupSettings::default(),
        }
    }
}

/// Timeouts and retry bounds for repository lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub api_base: String,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Attempts per request, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout_ms: 30_000,
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
        }
    }
}

impl LookupSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl SyncConfig {
    /// Load `rulesets.toml` from `root`, or defaults when it is absent.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            tracing::debug!(path = %path, "no config file, using defaults");
            return Self::default().validated();
        }
        Self::load_from(&path)
    }

    /// Load an explicit config file.
    pub fn load_from(path: &NormalizedPath) -> Result<Self> {
        let config: SyncConfig = ConfigStore::new().load(path)?;
        tracing::debug!(path = %path, "loaded config");
        config.validated()
    }

    /// Directory holding the ruleset files under `root`.
    pub fn rulesets_root(&self, root: &NormalizedPath) -> NormalizedPath {
        if self.rulesets_dir.is_absolute() {
            NormalizedPath::new(&self.rulesets_dir)
        } else {
            root.join(&self.rulesets_dir.to_string_lossy())
        }
    }

    /// Reject settings a pass cannot run with.
    pub fn validated(self) -> Result<Self> {
        if self.organization.trim().is_empty() {
            return Err(Error::invalid_config("organization must not be empty"));
        }
        if self.required_tag.trim().is_empty() {
            return Err(Error::invalid_config("required_tag must not be empty"));
        }
        if self.extension.trim().is_empty() {
            return Err(Error::invalid_config("extension must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(Error::invalid_config("concurrency must be at least 1"));
        }
        if self.lookup.max_attempts == 0 {
            return Err(Error::invalid_config("lookup.max_attempts must be at least 1"));
        }
        if self.lookup.initial_backoff_ms > self.lookup.max_backoff_ms {
            return Err(Error::invalid_config(
                "lookup.initial_backoff_ms must not exceed lookup.max_backoff_ms",
            ));
        }
        Ok(self)
    }
}
