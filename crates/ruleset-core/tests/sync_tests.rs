//! Tests for the SyncEngine

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use ruleset_core::{
    AvailabilityChecker, IneligibleReason, LookupCache, LookupUnavailable, Removal,
    RepositoryLookup, RulesetStatus, SyncEngine, SyncOptions,
};
use ruleset_test_utils::{FakeLookup, RulesetRepo};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn engine(repo: &RulesetRepo, lookup: Arc<dyn RepositoryLookup>) -> SyncEngine {
    let checker = AvailabilityChecker::new(lookup, Arc::new(LookupCache::new()));
    SyncEngine::new(repo.store(), checker)
}

fn pruning_lookup() -> Arc<FakeLookup> {
    Arc::new(
        FakeLookup::new()
            .with_repo("A", &["v0", "v1"])
            .with_repo("B", &[]),
    )
}

#[tokio::test]
async fn test_removes_ineligible_references() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nB\n# note\nC\n");

    let report = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.read_ruleset("TDD"), "A\n# note\n");

    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.status, RulesetStatus::Updated);
    assert_eq!(tdd.checked, 3);
    assert_eq!(
        tdd.removed,
        vec![
            Removal {
                reference: "B".into(),
                line: 2,
                reason: IneligibleReason::TagMissing,
            },
            Removal {
                reference: "C".into(),
                line: 4,
                reason: IneligibleReason::RepoMissing,
            },
        ]
    );
    assert_eq!(report.scanned, 1);
    assert_eq!(report.modified, 1);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nB\n# note\nC\n");
    repo.write_ruleset("Clean", "# all good\nA\n");
    let lookup = pruning_lookup();

    let first = engine(&repo, lookup.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    let after_first = repo.read_ruleset("TDD");
    let second = engine(&repo, lookup)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.total_removed(), 2);
    assert_eq!(second.total_removed(), 0);
    assert_eq!(second.modified, 0);
    assert!(
        second
            .rulesets
            .iter()
            .all(|r| r.status == RulesetStatus::Unchanged)
    );
    assert_eq!(repo.read_ruleset("TDD"), after_first);
}

#[tokio::test]
async fn test_unavailable_lookup_keeps_reference() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nD\nB\n");
    let lookup = Arc::new(
        FakeLookup::new()
            .with_repo("A", &["v0"])
            .with_repo("B", &["v0"])
            .with_unavailable("D", "timed out"),
    );

    let report = engine(&repo, lookup)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.read_ruleset("TDD"), "A\nD\nB\n");
    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.status, RulesetStatus::Unchanged);
    assert!(tdd.removed.is_empty());
    assert_eq!(tdd.skipped.len(), 1);
    assert_eq!(tdd.skipped[0].reference, "D");
    assert_eq!(tdd.skipped[0].line, 2);
    assert_eq!(tdd.skipped[0].reason, "timed out");
}

#[tokio::test]
async fn test_unavailable_and_removed_in_same_ruleset() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "D\nC\nA\n");
    let lookup = Arc::new(
        FakeLookup::new()
            .with_repo("A", &["v0"])
            .with_unavailable("D", "503"),
    );

    let report = engine(&repo, lookup)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.read_ruleset("TDD"), "D\nA\n");
    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.removed.len(), 1);
    assert_eq!(tdd.skipped.len(), 1);
}

#[tokio::test]
async fn test_blank_lines_and_comments_survive() {
    let repo = RulesetRepo::new();
    let content = "# header\n\nA\n  # indented\nGone\n\n\tB\n# footer\n";
    repo.write_ruleset("TDD", content);
    let lookup = Arc::new(
        FakeLookup::new()
            .with_repo("A", &["v0"])
            .with_repo("B", &["v0"]),
    );

    engine(&repo, lookup)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        repo.read_ruleset("TDD"),
        "# header\n\nA\n  # indented\n\n\tB\n# footer\n"
    );
}

#[tokio::test]
async fn test_duplicates_are_judged_individually() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nC\nA\nC\n");

    let report = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.read_ruleset("TDD"), "A\nA\n");
    assert_eq!(report.ruleset("TDD").unwrap().removed.len(), 2);
}

#[tokio::test]
async fn test_emptied_ruleset_is_kept_as_empty_file() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "B\nC\n");

    engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.ruleset_files(), vec!["TDD.txt"]);
    assert_eq!(repo.read_ruleset("TDD"), "");
}

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nB\n# note\nC\n");

    let report = engine(&repo, pruning_lookup())
        .with_options(SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.read_ruleset("TDD"), "A\nB\n# note\nC\n");
    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.status, RulesetStatus::WouldUpdate);
    assert!(report.dry_run);
    assert!(report.has_changes());

    let diff = tdd.diff.as_deref().unwrap();
    assert!(diff.contains("-B\n"), "diff should drop B, got:\n{diff}");
    assert!(diff.contains("-C\n"), "diff should drop C, got:\n{diff}");
    assert!(!diff.contains("-A\n"), "diff should keep A, got:\n{diff}");
}

#[tokio::test]
async fn test_shared_references_are_looked_up_once_per_pass() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("One", "A\nB\n");
    repo.write_ruleset("Two", "A\nB\nA\n");
    let lookup = pruning_lookup();

    engine(&repo, lookup.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    // exists + list_tags per repository
    assert_eq!(lookup.calls_for("A"), 2);
    assert_eq!(lookup.calls_for("B"), 2);
}

#[tokio::test]
async fn test_unreadable_ruleset_does_not_abort_pass() {
    let repo = RulesetRepo::new();
    fs::write(repo.ruleset_path("Alpha"), [0xff, 0xfe]).unwrap();
    repo.write_ruleset("Beta", "A\nC\n");

    let report = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.ruleset("Alpha").unwrap().status, RulesetStatus::Failed);
    assert!(report.ruleset("Alpha").unwrap().error.is_some());
    assert_eq!(report.ruleset("Beta").unwrap().status, RulesetStatus::Updated);
    assert_eq!(repo.read_ruleset("Beta"), "A\n");
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_unwritable_ruleset_does_not_abort_pass() {
    use fs2::FileExt;

    let repo = RulesetRepo::new();
    repo.write_ruleset("Alpha", "A\nC\n");
    repo.write_ruleset("Beta", "A\nC\n");

    let lock = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(repo.rulesets_dir().join(".Alpha.txt.lock"))
        .unwrap();
    FileExt::lock_exclusive(&lock).unwrap();

    let report = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    drop(lock);

    let alpha = report.ruleset("Alpha").unwrap();
    assert_eq!(alpha.status, RulesetStatus::Failed);
    assert_eq!(alpha.removed.len(), 0);
    assert_eq!(repo.read_ruleset("Alpha"), "A\nC\n");
    assert_eq!(report.ruleset("Beta").unwrap().status, RulesetStatus::Updated);
    assert_eq!(repo.read_ruleset("Beta"), "A\n");
}

#[tokio::test]
async fn test_missing_rulesets_directory_is_fatal() {
    let repo = RulesetRepo::without_rulesets_dir();

    let result = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(ruleset_core::Error::RulesetRootMissing { .. })
    ));
}

#[tokio::test]
async fn test_empty_directory_reports_nothing() {
    let repo = RulesetRepo::new();

    let report = engine(&repo, pruning_lookup())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scanned, 0);
    assert!(report.is_success());
    assert!(!report.has_changes());
}

#[tokio::test]
async fn test_cancelled_before_start_touches_nothing() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nB\n");
    let lookup = pruning_lookup();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine(&repo, lookup.clone()).run(&cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.scanned, 0);
    assert_eq!(lookup.total_calls(), 0);
    assert_eq!(repo.read_ruleset("TDD"), "A\nB\n");
}

/// Cancels the pass the moment a given repository is looked up.
struct CancellingLookup {
    inner: FakeLookup,
    trigger: String,
    cancel: CancellationToken,
}

#[async_trait]
impl RepositoryLookup for CancellingLookup {
    async fn exists(&self, name: &str) -> Result<bool, LookupUnavailable> {
        if name == self.trigger {
            self.cancel.cancel();
        }
        self.inner.exists(name).await
    }

    async fn list_tags(&self, name: &str) -> Result<Vec<String>, LookupUnavailable> {
        self.inner.list_tags(name).await
    }
}

#[tokio::test]
async fn test_cancel_mid_ruleset_leaves_it_untouched() {
    let repo = RulesetRepo::new();
    repo.write_ruleset("Alpha", "A\nB\n");
    repo.write_ruleset("Beta", "A\nTrigger\nC\n");
    repo.write_ruleset("Gamma", "B\n");
    let cancel = CancellationToken::new();
    let lookup = Arc::new(CancellingLookup {
        inner: FakeLookup::new().with_repo("A", &["v0"]).with_repo("B", &[]),
        trigger: "Trigger".into(),
        cancel: cancel.clone(),
    });

    let report = engine(&repo, lookup)
        .with_options(SyncOptions {
            dry_run: false,
            concurrency: 1,
        })
        .run(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.ruleset("Alpha").unwrap().status, RulesetStatus::Updated);
    assert_eq!(repo.read_ruleset("Alpha"), "A\n");
    assert_eq!(report.ruleset("Beta").unwrap().status, RulesetStatus::Cancelled);
    assert_eq!(repo.read_ruleset("Beta"), "A\nTrigger\nC\n");
    assert_eq!(report.ruleset("Gamma").unwrap().status, RulesetStatus::Cancelled);
    assert_eq!(repo.read_ruleset("Gamma"), "B\n");
}

/// Tracks how many lookups are in flight at once.
struct SlowLookup {
    inner: FakeLookup,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl RepositoryLookup for SlowLookup {
    async fn exists(&self, name: &str) -> Result<bool, LookupUnavailable> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.exists(name).await
    }

    async fn list_tags(&self, name: &str) -> Result<Vec<String>, LookupUnavailable> {
        self.inner.list_tags(name).await
    }
}

#[tokio::test]
async fn test_checks_overlap_across_small_rulesets() {
    let repo = RulesetRepo::new();
    let inner = FakeLookup::new();
    for i in 0..6 {
        let name = format!("Rule{i}");
        inner.set_repo(&name, &["v0"]);
        repo.write_ruleset(&format!("Set{i}"), &format!("{name}\n"));
    }
    let lookup = Arc::new(SlowLookup {
        inner,
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });

    let report = engine(&repo, lookup.clone())
        .with_options(SyncOptions {
            dry_run: false,
            concurrency: 4,
        })
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scanned, 6);
    assert!(report.is_success());
    let peak = lookup.peak.load(Ordering::SeqCst);
    assert!(peak > 1, "one-reference rulesets were checked one at a time");
    assert!(peak <= 4, "concurrency bound exceeded: {peak}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_keep_line_order() {
    let repo = RulesetRepo::new();
    let names: Vec<String> = (0..40).map(|i| format!("Rule{i:02}")).collect();
    repo.write_ruleset("Big", &format!("{}\n", names.join("\n")));

    let lookup = FakeLookup::new();
    for (i, name) in names.iter().enumerate() {
        if i % 3 != 0 {
            lookup.set_repo(name, &["v0"]);
        }
    }

    let report = engine(&repo, Arc::new(lookup))
        .with_options(SyncOptions {
            dry_run: false,
            concurrency: 16,
        })
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let expected: Vec<&str> = names
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0)
        .map(|(_, n)| n.as_str())
        .collect();
    assert_eq!(repo.read_ruleset("Big"), format!("{}\n", expected.join("\n")));

    let removed_lines: Vec<usize> = report.ruleset("Big").unwrap().removed.iter().map(|r| r.line).collect();
    let mut sorted = removed_lines.clone();
    sorted.sort();
    assert_eq!(removed_lines, sorted);
}
