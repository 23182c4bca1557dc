//! Ruleset persistence
//!
//! Rulesets live as `<name>.<ext>` files in one directory. Loading is lazy:
//! [`RulesetStore::load_all`] enumerates the directory up front and reads
//! each file only when the iterator reaches it, so a pass always sees the
//! current on-disk content and one unreadable file does not hide the rest.

use ruleset_fs::{NormalizedPath, RobustnessConfig, io};

use crate::ruleset::Ruleset;
use crate::{Error, Result};

/// Reads and rewrites ruleset files under a root directory.
#[derive(Debug, Clone)]
pub struct RulesetStore {
    root: NormalizedPath,
    extension: String,
    robustness: RobustnessConfig,
}

impl RulesetStore {
    pub fn new(root: NormalizedPath) -> Self {
        Self {
            root,
            extension: "txt".to_string(),
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// File backing the ruleset called `name`.
    pub fn path_for(&self, name: &str) -> NormalizedPath {
        self.root.join(&format!("{}.{}", name, self.extension))
    }

    /// Enumerate every ruleset in name order.
    ///
    /// Calling this again restarts from the current directory state.
    ///
    /// # Errors
    ///
    /// [`Error::RulesetRootMissing`] if the directory is missing. Per-file
    /// read failures are yielded by the iterator as [`Error::IoFailure`].
    pub fn load_all(&self) -> Result<RulesetIter> {
        let paths = io::list_files(&self.root, &self.extension).map_err(|e| match e {
            ruleset_fs::Error::NotADirectory { path } => Error::RulesetRootMissing { path },
            other => Error::Fs(other),
        })?;

        tracing::debug!(root = %self.root, count = paths.len(), "enumerated rulesets");
        Ok(RulesetIter {
            paths: paths.into_iter(),
        })
    }

    /// Load a single ruleset by name.
    pub fn load(&self, name: &str) -> Result<Ruleset> {
        read_ruleset(name, self.path_for(name))
    }

    /// Atomically replace the ruleset's file with its rendered lines.
    pub fn save(&self, ruleset: &Ruleset) -> Result<()> {
        io::write_atomic(ruleset.path(), ruleset.render().as_bytes(), self.robustness)
            .map_err(|e| Error::io_failure(ruleset.name(), e))?;
        tracing::debug!(ruleset = ruleset.name(), path = %ruleset.path(), "saved");
        Ok(())
    }
}

/// Lazy sequence of rulesets produced by [`RulesetStore::load_all`].
#[derive(Debug)]
pub struct RulesetIter {
    paths: std::vec::IntoIter<NormalizedPath>,
}

impl Iterator for RulesetIter {
    type Item = Result<Ruleset>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let name = path.file_stem().unwrap_or_default().to_string();
        Some(read_ruleset(&name, path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl ExactSizeIterator for RulesetIter {}

fn read_ruleset(name: &str, path: NormalizedPath) -> Result<Ruleset> {
    let content = io::read_text(&path).map_err(|e| Error::io_failure(name, e))?;
    Ok(Ruleset::parse(name, path, &content))
}
