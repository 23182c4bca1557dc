//! SyncEngine implementation
//!
//! One pass loads every ruleset, checks all references through a single
//! bounded stream, and rewrites the files that lost references. A ruleset
//! is written once, after all of its checks resolved, or not at all.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use similar::TextDiff;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::availability::{AvailabilityChecker, Verdict};
use crate::lookup::LookupUnavailable;
use crate::ruleset::Ruleset;
use crate::store::RulesetStore;

use super::report::{Removal, RulesetReport, RulesetStatus, Skip, SyncReport};

/// Options for a sync pass
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute removals without rewriting any file.
    pub dry_run: bool,
    /// Maximum availability checks in flight.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 8,
        }
    }
}

type CheckOutcome = (usize, String, std::result::Result<Verdict, LookupUnavailable>);

/// Engine for one availability-sync pass
pub struct SyncEngine {
    store: RulesetStore,
    checker: AvailabilityChecker,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(store: RulesetStore, checker: AvailabilityChecker) -> Self {
        Self {
            store,
            checker,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run a full pass.
    ///
    /// Checks for every reference of every ruleset share one bounded stream,
    /// so small rulesets overlap with each other. Results are then grouped
    /// back per ruleset and each ruleset is written at most once.
    ///
    /// Per-reference lookup failures and per-ruleset I/O failures end up in
    /// the report. Once `cancel` fires no new lookups start; rulesets whose
    /// checks all resolved are still applied, the rest are reported
    /// cancelled and left untouched.
    ///
    /// # Errors
    ///
    /// Only when the ruleset directory cannot be enumerated.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport> {
        let rulesets: Vec<Result<Ruleset>> = self.store.load_all()?.collect();
        let mut report = SyncReport::new(self.options.dry_run);

        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let mut outcomes = self.check_all(&rulesets, cancel).await;

        for (slot, loaded) in rulesets.iter().enumerate() {
            let outcome = match loaded {
                Ok(ruleset) => {
                    let span = tracing::info_span!("ruleset", name = ruleset.name());
                    let _entered = span.enter();
                    self.apply(ruleset, std::mem::take(&mut outcomes[slot]))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load ruleset");
                    RulesetReport::failed(e.ruleset().unwrap_or("<unknown>"), e.to_string())
                }
            };
            report.push(outcome);
        }

        tracing::info!(
            scanned = report.scanned,
            modified = report.modified,
            removed = report.total_removed(),
            skipped = report.total_skipped(),
            cancelled = report.cancelled,
            dry_run = report.dry_run,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Turn the resolved checks of one ruleset into its report, writing the
    /// file when references were removed.
    fn apply(&self, ruleset: &Ruleset, outcomes: Vec<CheckOutcome>) -> RulesetReport {
        if outcomes.len() < ruleset.reference_count() {
            tracing::warn!("cancelled before all checks resolved, leaving file untouched");
            return RulesetReport::cancelled(ruleset.name());
        }
        let checked = outcomes.len();

        let mut removed_lines = BTreeSet::new();
        let mut removed = Vec::new();
        let mut skipped = Vec::new();
        for (idx, reference, outcome) in outcomes {
            match outcome {
                Ok(Verdict::Eligible) => {}
                Ok(Verdict::Ineligible(reason)) => {
                    tracing::info!(reference = %reference, %reason, "removing reference");
                    removed_lines.insert(idx);
                    removed.push(Removal {
                        reference,
                        line: idx + 1,
                        reason,
                    });
                }
                Err(e) => {
                    tracing::warn!(reference = %reference, reason = %e.reason, "lookup unavailable, keeping reference");
                    skipped.push(Skip {
                        reference,
                        line: idx + 1,
                        reason: e.reason,
                    });
                }
            }
        }

        if removed.is_empty() {
            return RulesetReport::unchanged(ruleset.name(), checked, skipped);
        }

        let filtered = ruleset.without(&removed_lines);
        let diff = render_diff(ruleset, &filtered);

        if self.options.dry_run {
            return RulesetReport {
                status: RulesetStatus::WouldUpdate,
                removed,
                diff: Some(diff),
                ..RulesetReport::unchanged(ruleset.name(), checked, skipped)
            };
        }

        match self.store.save(&filtered) {
            Ok(()) => RulesetReport {
                status: RulesetStatus::Updated,
                removed,
                diff: Some(diff),
                ..RulesetReport::unchanged(ruleset.name(), checked, skipped)
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to save ruleset");
                RulesetReport {
                    status: RulesetStatus::Failed,
                    error: Some(e.to_string()),
                    ..RulesetReport::unchanged(ruleset.name(), checked, skipped)
                }
            }
        }
    }

    /// Check every reference of every loaded ruleset, at most `concurrency`
    /// at a time across the whole pass.
    ///
    /// Returns one outcome list per ruleset slot, in line order. A list is
    /// shorter than the ruleset's reference count when cancellation cut the
    /// checks short.
    async fn check_all(
        &self,
        rulesets: &[Result<Ruleset>],
        cancel: &CancellationToken,
    ) -> Vec<Vec<CheckOutcome>> {
        let checks: Vec<(usize, usize, String)> = rulesets
            .iter()
            .enumerate()
            .filter_map(|(slot, loaded)| loaded.as_ref().ok().map(|ruleset| (slot, ruleset)))
            .flat_map(|(slot, ruleset)| {
                ruleset
                    .references()
                    .map(move |(idx, reference)| (slot, idx, reference.name().to_string()))
            })
            .collect();

        let resolved: Vec<(usize, CheckOutcome)> = stream::iter(checks)
            .map(|(slot, idx, name)| async move {
                let outcome = self.checker.check(&name).await;
                (slot, (idx, name, outcome))
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .take_until(cancel.cancelled())
            .collect()
            .await;

        let mut grouped: Vec<Vec<CheckOutcome>> = rulesets.iter().map(|_| Vec::new()).collect();
        for (slot, outcome) in resolved {
            grouped[slot].push(outcome);
        }
        for outcomes in &mut grouped {
            outcomes.sort_by_key(|(idx, _, _)| *idx);
        }
        grouped
    }
}

fn render_diff(before: &Ruleset, after: &Ruleset) -> String {
    let old = before.render();
    let new = after.render();
    let file = before.path().file_name().unwrap_or(before.name());
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header(&format!("a/{file}"), &format!("b/{file}"))
        .to_string()
}
