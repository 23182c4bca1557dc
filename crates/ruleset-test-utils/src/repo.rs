//! [`RulesetRepo`] builder for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ruleset_core::RulesetStore;
use ruleset_fs::{NormalizedPath, RobustnessConfig};
use tempfile::TempDir;

/// A temporary rulesets repository: a root directory with `rulesets/`.
///
/// # Example
///
/// ```rust
/// use ruleset_test_utils::RulesetRepo;
///
/// let repo = RulesetRepo::new();
/// repo.write_ruleset("TDD", "A\nB\n# note\nC\n");
/// assert_eq!(repo.read_ruleset("TDD"), "A\nB\n# note\nC\n");
/// ```
pub struct RulesetRepo {
    temp_dir: TempDir,
}

impl Default for RulesetRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesetRepo {
    /// Create a temporary root with an empty `rulesets/` directory.
    ///
    /// # Panics
    /// Panics if the filesystem operations fail.
    pub fn new() -> Self {
        let repo = Self::without_rulesets_dir();
        fs::create_dir(repo.rulesets_dir())
            .unwrap_or_else(|e| panic!("RulesetRepo::new: failed to create rulesets/: {e}"));
        repo
    }

    /// Create a temporary root with no `rulesets/` directory.
    pub fn without_rulesets_dir() -> Self {
        Self {
            temp_dir: TempDir::new()
                .unwrap_or_else(|e| panic!("RulesetRepo: failed to create temp dir: {e}")),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn rulesets_dir(&self) -> PathBuf {
        self.root().join("rulesets")
    }

    pub fn ruleset_path(&self, name: &str) -> PathBuf {
        self.rulesets_dir().join(format!("{name}.txt"))
    }

    pub fn write_ruleset(&self, name: &str, content: &str) {
        fs::write(self.ruleset_path(name), content)
            .unwrap_or_else(|e| panic!("RulesetRepo: failed to write ruleset {name}: {e}"));
    }

    pub fn read_ruleset(&self, name: &str) -> String {
        fs::read_to_string(self.ruleset_path(name))
            .unwrap_or_else(|e| panic!("RulesetRepo: failed to read ruleset {name}: {e}"))
    }

    /// Write `rulesets.toml` at the root.
    pub fn write_config(&self, content: &str) {
        fs::write(self.root().join("rulesets.toml"), content)
            .unwrap_or_else(|e| panic!("RulesetRepo: failed to write config: {e}"));
    }

    /// File names currently in `rulesets/`, sorted.
    pub fn ruleset_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.rulesets_dir())
            .unwrap_or_else(|e| panic!("RulesetRepo: failed to list rulesets/: {e}"))
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// A store over `rulesets/` with a short lock timeout and no fsync.
    pub fn store(&self) -> RulesetStore {
        RulesetStore::new(NormalizedPath::new(self.rulesets_dir())).with_robustness(
            RobustnessConfig {
                lock_timeout: Duration::from_millis(500),
                enable_fsync: false,
            },
        )
    }
}
