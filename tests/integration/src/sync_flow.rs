//! End-to-end sync flow
//!
//! Exercises the complete pass: config loading -> ruleset store -> GitHub
//! lookups (against a mock API) -> rewritten files and report.

use pretty_assertions::assert_eq;
use ruleset_core::{
    AvailabilityChecker, IneligibleReason, LookupCache, RulesetStatus, SyncConfig, SyncEngine,
    SyncOptions, SyncReport,
};
use ruleset_fs::NormalizedPath;
use ruleset_github::GitHubClient;
use ruleset_test_utils::RulesetRepo;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Hosted<'a> {
    name: &'a str,
    tags: &'a [&'a str],
}

async fn mock_github(repos: &[Hosted<'_>]) -> MockServer {
    let server = MockServer::start().await;
    for repo in repos {
        Mock::given(method("GET"))
            .and(path(format!("/repos/CursorCult/{}", repo.name)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "archived": false, "fork": false })),
            )
            .mount(&server)
            .await;
        let tags: Vec<_> = repo.tags.iter().map(|t| json!({ "name": t })).collect();
        Mock::given(method("GET"))
            .and(path(format!("/repos/CursorCult/{}/tags", repo.name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags))
            .mount(&server)
            .await;
    }
    server
}

/// Build an engine the way the CLI does, from the repo's config file.
fn engine(repo: &RulesetRepo, server: &MockServer, dry_run: bool) -> SyncEngine {
    let root = NormalizedPath::new(repo.root());
    let mut config = SyncConfig::load(&root).unwrap();
    config.lookup.api_base = server.uri();

    let client = GitHubClient::new(&config.organization, &config.lookup, None).unwrap();
    let checker = AvailabilityChecker::new(Arc::new(client), Arc::new(LookupCache::new()))
        .with_required_tag(&config.required_tag);

    SyncEngine::new(repo.store(), checker).with_options(SyncOptions {
        dry_run,
        concurrency: config.concurrency,
    })
}

async fn run(repo: &RulesetRepo, server: &MockServer, dry_run: bool) -> SyncReport {
    engine(repo, server, dry_run)
        .run(&CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_pruning_example() {
    let server = mock_github(&[
        Hosted { name: "A", tags: &["v0"] },
        Hosted { name: "B", tags: &[] },
    ])
    .await;
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nB\n# note\nC\n");

    let report = run(&repo, &server, false).await;

    assert_eq!(repo.read_ruleset("TDD"), "A\n# note\n");
    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.status, RulesetStatus::Updated);
    let removed: Vec<_> = tdd
        .removed
        .iter()
        .map(|r| (r.reference.as_str(), r.reason))
        .collect();
    assert_eq!(
        removed,
        vec![
            ("B", IneligibleReason::TagMissing),
            ("C", IneligibleReason::RepoMissing)
        ]
    );
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let server = mock_github(&[
        Hosted { name: "A", tags: &["v0", "v1"] },
        Hosted { name: "B", tags: &["v1", "v2"] },
    ])
    .await;
    let repo = RulesetRepo::new();
    repo.write_ruleset("Docs", "# docs\nA\n\nB\n");
    repo.write_ruleset("TDD", "A\nGone\n");

    let first = run(&repo, &server, false).await;
    let after_first = (repo.read_ruleset("Docs"), repo.read_ruleset("TDD"));
    let second = run(&repo, &server, false).await;

    assert_eq!(first.total_removed(), 2);
    assert_eq!(second.total_removed(), 0);
    assert_eq!(second.modified, 0);
    assert_eq!(after_first, (repo.read_ruleset("Docs"), repo.read_ruleset("TDD")));
    assert_eq!(after_first.0, "# docs\nA\n\n");
}

#[tokio::test]
async fn test_shared_reference_is_fetched_once_per_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/CursorCult/A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "archived": false })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/CursorCult/A/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "v0" }])))
        .expect(1)
        .mount(&server)
        .await;
    let repo = RulesetRepo::new();
    repo.write_ruleset("One", "A\n");
    repo.write_ruleset("Two", "A\nA\n");
    repo.write_ruleset("Three", "# again\nA\n");

    let report = run(&repo, &server, false).await;

    assert_eq!(report.scanned, 3);
    assert_eq!(report.modified, 0);
}

#[tokio::test]
async fn test_dry_run_reports_diff_without_writing() {
    let server = mock_github(&[Hosted { name: "A", tags: &["v0"] }]).await;
    let repo = RulesetRepo::new();
    repo.write_ruleset("TDD", "A\nC\n");

    let report = run(&repo, &server, true).await;

    assert_eq!(repo.read_ruleset("TDD"), "A\nC\n");
    let tdd = report.ruleset("TDD").unwrap();
    assert_eq!(tdd.status, RulesetStatus::WouldUpdate);
    assert!(tdd.diff.as_deref().unwrap().contains("\n-C\n"));
}

#[tokio::test]
async fn test_api_outage_changes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let repo = RulesetRepo::new();
    repo.write_config("[lookup]\nmax_attempts = 2\ninitial_backoff_ms = 1\nmax_backoff_ms = 2\n");
    repo.write_ruleset("TDD", "A\nB\n");

    let report = run(&repo, &server, false).await;

    assert_eq!(repo.read_ruleset("TDD"), "A\nB\n");
    assert_eq!(report.total_skipped(), 2);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_config_file_sets_organization_and_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/Acme/A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/Acme/A/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "stable" }])))
        .mount(&server)
        .await;
    let repo = RulesetRepo::new();
    repo.write_config("organization = \"Acme\"\nrequired_tag = \"stable\"\n");
    repo.write_ruleset("TDD", "A\n");

    let report = run(&repo, &server, false).await;

    assert_eq!(report.total_removed(), 0);
    assert_eq!(repo.read_ruleset("TDD"), "A\n");
}
