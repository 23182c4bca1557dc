//! Report types for a sync pass
//!
//! The report is the externally observable output of a pass: every removal
//! and every skip with its reason, plus scan and modification counts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::availability::IneligibleReason;

/// A reference dropped from a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub reference: String,
    /// 1-based line number in the original file
    pub line: usize,
    pub reason: IneligibleReason,
}

/// A reference kept because its availability could not be confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    pub reference: String,
    /// 1-based line number in the original file
    pub line: usize,
    pub reason: String,
}

/// What happened to one ruleset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RulesetStatus {
    /// Every reference is eligible or could not be checked
    Unchanged,
    /// Ineligible references were removed and the file rewritten
    Updated,
    /// Dry run: the file would have been rewritten
    WouldUpdate,
    /// The file could not be read or written
    Failed,
    /// The pass was cancelled before all checks resolved; file untouched
    Cancelled,
}

/// Outcome for a single ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulesetReport {
    pub name: String,
    pub status: RulesetStatus,
    /// Number of reference lines checked
    pub checked: usize,
    pub removed: Vec<Removal>,
    pub skipped: Vec<Skip>,
    /// Unified diff of the rewrite, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RulesetReport {
    pub fn unchanged(name: impl Into<String>, checked: usize, skipped: Vec<Skip>) -> Self {
        Self {
            name: name.into(),
            status: RulesetStatus::Unchanged,
            checked,
            removed: Vec::new(),
            skipped,
            diff: None,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RulesetStatus::Failed,
            checked: 0,
            removed: Vec::new(),
            skipped: Vec::new(),
            diff: None,
            error: Some(error.into()),
        }
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self {
            status: RulesetStatus::Cancelled,
            ..Self::unchanged(name, 0, Vec::new())
        }
    }

    /// True when the file was, or in a dry run would be, rewritten.
    pub fn is_modified(&self) -> bool {
        matches!(
            self.status,
            RulesetStatus::Updated | RulesetStatus::WouldUpdate
        )
    }
}

/// Aggregate outcome of a sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub cancelled: bool,
    /// Rulesets visited, including ones that failed to load
    pub scanned: usize,
    /// Rulesets rewritten (or that would be in a dry run)
    pub modified: usize,
    pub rulesets: Vec<RulesetReport>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            dry_run,
            cancelled: false,
            scanned: 0,
            modified: 0,
            rulesets: Vec::new(),
        }
    }

    pub fn push(&mut self, ruleset: RulesetReport) {
        self.scanned += 1;
        if ruleset.is_modified() {
            self.modified += 1;
        }
        if ruleset.status == RulesetStatus::Cancelled {
            self.cancelled = true;
        }
        self.rulesets.push(ruleset);
    }

    pub fn ruleset(&self, name: &str) -> Option<&RulesetReport> {
        self.rulesets.iter().find(|r| r.name == name)
    }

    pub fn total_removed(&self) -> usize {
        self.rulesets.iter().map(|r| r.removed.len()).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.rulesets.iter().map(|r| r.skipped.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RulesetReport> {
        self.rulesets
            .iter()
            .filter(|r| r.status == RulesetStatus::Failed)
    }

    pub fn has_changes(&self) -> bool {
        self.modified > 0
    }

    /// No ruleset failed and the pass ran to completion.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failures().next().is_none()
    }
}
