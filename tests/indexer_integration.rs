//! Integration tests for the reconciler.
//!
//! Real repositories on disk, an in-memory search engine. Each test builds
//! the branches it needs, runs `update()`, and checks both the report and the
//! calls the engine received.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing_test::traced_test;

use common::TestRepo;
use mapsync::core::schema::Schema;
use mapsync::engine::{
    BranchOutcome, BranchSelector, ErrorKind, Indexer, IndexerError, IndexerOptions,
    UpdateOptions, UpdateReport,
};
use mapsync::search::mock::{MockOperation, MockSearchEngine};
use mapsync::search::{CachedSearchEngine, SearchEngineError};

fn indexer(repo: &TestRepo, engine: &MockSearchEngine) -> Indexer {
    Indexer::new(
        repo.path(),
        Arc::new(engine.clone()),
        IndexerOptions::default(),
    )
}

async fn update(indexer: &Indexer) -> UpdateReport {
    indexer
        .update(UpdateOptions::default())
        .await
        .expect("update should complete")
}

fn schema(value: serde_json::Value) -> Schema {
    Schema::from_value(value).unwrap()
}

fn created_index<'a>(report: &'a UpdateReport, branch: &str) -> Option<&'a str> {
    match report.get(branch) {
        Some(BranchOutcome::Created { index, .. }) => Some(index.as_str()),
        _ => None,
    }
}

fn is_unchanged(report: &UpdateReport, branch: &str) -> bool {
    matches!(report.get(branch), Some(BranchOutcome::Unchanged { .. }))
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn fresh_branches_get_first_generation() {
        let repo = TestRepo::new();
        let articles = r#"{"articles": {"properties": {"title": {"type": "text"}}}}"#;
        repo.commit_mapping("master", articles);
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(created_index(&report, "master"), Some("master_1"));
        assert_eq!(created_index(&report, "staging"), Some("staging_1"));
        assert!(!report.has_failures());

        let mut created = engine.created();
        created.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            created,
            vec![
                (
                    "master_1".to_string(),
                    schema(json!({"articles": {"properties": {"title": {"type": "text"}}}}))
                ),
                ("staging_1".to_string(), Schema::empty()),
            ]
        );
    }

    #[tokio::test]
    async fn matching_mapping_is_unchanged() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"x":1}"#);
        let engine = MockSearchEngine::new().with_index("master", json!({"x": 1}));

        let report = update(&indexer(&repo, &engine)).await;

        assert!(is_unchanged(&report, "master"));
        assert!(engine.created().is_empty());
    }

    #[tokio::test]
    async fn empty_mapping_on_empty_index_is_unchanged() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new().with_index("staging_1", json!({}));

        let report = update(&indexer(&repo, &engine)).await;

        assert!(is_unchanged(&report, "staging"));
        assert!(engine.created().is_empty());
    }

    #[tokio::test]
    async fn empty_mapping_without_index_is_created() {
        let repo = TestRepo::new();
        repo.commit_mapping("staging", "{}");
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(created_index(&report, "staging"), Some("staging_1"));
        assert_eq!(engine.index("staging_1"), Some(Schema::empty()));
    }

    #[tokio::test]
    async fn key_order_does_not_matter() {
        let repo = TestRepo::new();
        repo.commit_mapping(
            "master",
            r#"{"properties": {"b": {"type": "long"}, "a": {"type": "keyword"}}}"#,
        );
        let engine = MockSearchEngine::new().with_index(
            "master_1",
            json!({"properties": {"a": {"type": "keyword"}, "b": {"type": "long"}}}),
        );

        let report = update(&indexer(&repo, &engine)).await;

        assert!(is_unchanged(&report, "master"));
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"x":1}"#);
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new();
        let indexer = indexer(&repo, &engine);

        let first = update(&indexer).await;
        let second = update(&indexer).await;

        assert_eq!(first.created().count(), 2);
        assert!(is_unchanged(&second, "master"));
        assert!(is_unchanged(&second, "staging"));
        assert_eq!(engine.created().len(), 2);
    }

    #[tokio::test]
    async fn second_drift_creates_next_generation() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"v":1}"#);
        let engine = MockSearchEngine::new();
        let indexer = indexer(&repo, &engine);

        update(&indexer).await;
        repo.commit_mapping("master", r#"{"v":2}"#);
        let report = update(&indexer).await;

        assert_eq!(created_index(&report, "master"), Some("master_2"));
        assert_eq!(engine.index("master_1"), Some(schema(json!({"v": 1}))));
        assert_eq!(engine.index("master_2"), Some(schema(json!({"v": 2}))));
    }

    #[tokio::test]
    async fn drift_from_bare_index_creates_first_generation() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"v":2}"#);
        let engine = MockSearchEngine::new().with_index("master", json!({"v": 1}));

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(created_index(&report, "master"), Some("master_1"));
    }

    #[tokio::test]
    async fn nested_mapping_path() {
        let repo = TestRepo::new();
        repo.commit_files(
            "master",
            &[
                ("mapping.json", r#"{"ignored": true}"#),
                ("search/mapping.json", r#"{"used": true}"#),
            ],
        );
        let engine = MockSearchEngine::new();
        let indexer = Indexer::new(
            repo.path(),
            Arc::new(engine.clone()),
            IndexerOptions {
                mapping_path: "search/mapping.json".into(),
                ..IndexerOptions::default()
            },
        );

        update(&indexer).await;

        assert_eq!(engine.index("master_1"), Some(schema(json!({"used": true}))));
    }

    #[tokio::test]
    async fn mapping_directory_reads_as_empty() {
        let repo = TestRepo::new();
        repo.commit_files("master", &[("mapping.json/part.json", r#"{"x":1}"#)]);
        let engine = MockSearchEngine::new().with_index("master_1", json!({}));

        let report = update(&indexer(&repo, &engine)).await;

        assert!(is_unchanged(&report, "master"));
    }

    #[tokio::test]
    async fn branch_named_like_a_generation_gets_its_own_index() {
        let repo = TestRepo::new();
        repo.commit_mapping("release", r#"{"x":1}"#);
        repo.commit_mapping("release_1", r#"{"x":1}"#);
        let engine = MockSearchEngine::new().with_index("release_1", json!({"x": 1}));
        let indexer = indexer(&repo, &engine);

        let report = update(&indexer).await;

        assert!(is_unchanged(&report, "release"));
        assert_eq!(created_index(&report, "release_1"), Some("release_1_1"));
        assert_eq!(engine.index_names(), vec!["release_1", "release_1_1"]);

        let again = update(&indexer).await;
        assert!(is_unchanged(&again, "release"));
        assert!(is_unchanged(&again, "release_1"));
        assert_eq!(engine.created().len(), 1);
    }

    #[tokio::test]
    async fn no_branches_is_an_empty_report() {
        let repo = TestRepo::new();
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert!(report.outcomes.is_empty());
        assert!(engine.operations().is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn malformed_mapping_fails_only_its_branch() {
        let repo = TestRepo::new();
        repo.commit_mapping("broken", "{not json");
        repo.commit_mapping("master", r#"{"x":1}"#);
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(
            report.get("broken").and_then(BranchOutcome::error_kind),
            Some(ErrorKind::MalformedMapping)
        );
        assert_eq!(created_index(&report, "master"), Some("master_1"));
        assert_eq!(created_index(&report, "staging"), Some("staging_1"));
        assert!(engine.index("broken_1").is_none());
    }

    #[tokio::test]
    async fn non_object_mapping_is_malformed() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"["not", "an", "object"]"#);
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(
            report.get("master").and_then(BranchOutcome::error_kind),
            Some(ErrorKind::MalformedMapping)
        );
        assert!(engine.created().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_branch_fails_only_its_branch() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("master");
        repo.corrupt_branch("broken");
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(
            report.get("broken").and_then(BranchOutcome::error_kind),
            Some(ErrorKind::RepoRead)
        );
        assert_eq!(created_index(&report, "master"), Some("master_1"));
    }

    #[tokio::test]
    async fn lookup_failure_fails_only_its_branch() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("master");
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new()
            .fail_lookup("master", SearchEngineError::NetworkError("reset".into()));

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(
            report.get("master").and_then(BranchOutcome::error_kind),
            Some(ErrorKind::SearchEngine)
        );
        assert_eq!(created_index(&report, "staging"), Some("staging_1"));
    }

    #[tokio::test]
    async fn name_collision_is_reported() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"x":2}"#);
        let engine = MockSearchEngine::new().fail_create(
            "master_1",
            SearchEngineError::IndexExists {
                index: "master_1".into(),
            },
        );

        let report = update(&indexer(&repo, &engine)).await;

        match report.get("master") {
            Some(BranchOutcome::Failed { error, .. }) => {
                assert_eq!(error.kind(), ErrorKind::SearchEngine);
                assert!(error.to_string().contains("index already exists: master_1"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_index_name_fails_before_any_request() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("Feature");
        repo.commit_without_mapping("master");
        let engine = MockSearchEngine::new();

        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(
            report.get("Feature").and_then(BranchOutcome::error_kind),
            Some(ErrorKind::SearchEngine)
        );
        assert!(engine.operations().iter().all(|op| match op {
            MockOperation::GetCurrentMapping { lookup, .. } => lookup == "master",
            MockOperation::CreateIndex { index, .. } => index == "master_1",
        }));
    }

    #[tokio::test]
    async fn slow_lookup_times_out_alone() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("master");
        repo.commit_without_mapping("staging");
        let engine = MockSearchEngine::new().delay_lookup("master", Duration::from_secs(30));
        let indexer = Indexer::new(
            repo.path(),
            Arc::new(engine.clone()),
            IndexerOptions {
                call_timeout: Some(Duration::from_millis(100)),
                ..IndexerOptions::default()
            },
        );

        let started = Instant::now();
        let report = update(&indexer).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        match report.get("master") {
            Some(BranchOutcome::Failed { error, .. }) => {
                assert_eq!(error.kind(), ErrorKind::SearchEngine);
                assert!(error.to_string().contains("timed out"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(created_index(&report, "staging"), Some("staging_1"));
    }

    #[tokio::test]
    async fn missing_repository_fails_update() {
        let repo = TestRepo::new();
        let engine = MockSearchEngine::new();
        let indexer = Indexer::new(
            repo.root().join("missing.git"),
            Arc::new(engine),
            IndexerOptions::default(),
        );

        let err = indexer.update(UpdateOptions::default()).await.unwrap_err();

        assert!(matches!(err, IndexerError::RepoOpen { .. }));
        assert!(err.to_string().contains("missing.git"));
    }

    #[tokio::test]
    async fn failed_open_is_retried() {
        let repo = TestRepo::new();
        let path = repo.root().join("later.git");
        let indexer = Indexer::new(
            path.clone(),
            Arc::new(MockSearchEngine::new()),
            IndexerOptions::default(),
        );

        assert!(indexer.update(UpdateOptions::default()).await.is_err());
        git2::Repository::init_bare(&path).unwrap();

        let report = indexer.update(UpdateOptions::default()).await.unwrap();
        assert!(report.outcomes.is_empty());
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn branches_run_in_parallel() {
        let repo = TestRepo::new();
        let mut engine = MockSearchEngine::new();
        for i in 0..8 {
            let branch = format!("env-{}", i);
            repo.commit_without_mapping(&branch);
            engine = engine.delay_lookup(&branch, Duration::from_millis(400));
        }

        let started = Instant::now();
        let report = update(&indexer(&repo, &engine)).await;

        assert_eq!(report.created().count(), 8);
        // Sequential lookups alone would take 3.2s.
        assert!(started.elapsed() < Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn force_refresh_is_forwarded() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("master");
        let engine = MockSearchEngine::new();
        let indexer = indexer(&repo, &engine);

        indexer
            .update(UpdateOptions {
                force_refresh: true,
            })
            .await
            .unwrap();

        assert!(engine.operations().contains(&MockOperation::GetCurrentMapping {
            lookup: "master".into(),
            force_refresh: true,
        }));
    }

    #[tokio::test]
    async fn cached_engine_sees_its_own_creations() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"x":1}"#);
        let mock = MockSearchEngine::new();
        let cached = CachedSearchEngine::new(mock.clone(), Duration::from_secs(300));
        let indexer = Indexer::new(repo.path(), Arc::new(cached), IndexerOptions::default());

        let first = update(&indexer).await;
        let second = update(&indexer).await;

        assert_eq!(created_index(&first, "master"), Some("master_1"));
        assert!(is_unchanged(&second, "master"));
        assert_eq!(mock.created().len(), 1);
    }
}

mod selection {
    use super::*;

    #[tokio::test]
    async fn excluded_branches_are_not_touched() {
        let repo = TestRepo::new();
        repo.commit_without_mapping("master");
        repo.commit_without_mapping("wip/experiment");
        let engine = MockSearchEngine::new();
        let selector = BranchSelector::new(&[], &["wip/*".to_string()]).unwrap();
        let indexer = indexer(&repo, &engine).with_selector(selector);

        let branches = indexer.list_branches().await.unwrap();
        let report = update(&indexer).await;

        assert_eq!(branches.len(), 1);
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.get("wip/experiment").is_none());
    }

    #[tokio::test]
    async fn excluded_sibling_still_owns_its_generations() {
        let repo = TestRepo::new();
        repo.commit_mapping("release", r#"{"x":1}"#);
        repo.commit_mapping("release_2", r#"{"x":1}"#);
        let engine = MockSearchEngine::new().with_index("release_2", json!({"x": 1}));
        let selector = BranchSelector::new(&["release_*".to_string()], &[]).unwrap();

        let report = update(&indexer(&repo, &engine).with_selector(selector)).await;

        assert!(report.get("release").is_none());
        assert_eq!(created_index(&report, "release_2"), Some("release_2_1"));
    }
}

mod logging {
    use super::*;

    #[tokio::test]
    #[traced_test]
    async fn logs_current_and_drifted_branches() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", r#"{"x":1}"#);
        repo.commit_mapping("staging", r#"{"y":1}"#);
        let engine = MockSearchEngine::new().with_index("master_1", json!({"x": 1}));

        update(&indexer(&repo, &engine)).await;

        assert!(logs_contain("mapping already current"));
        assert!(logs_contain("mapping needs update"));
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_branch_failures() {
        let repo = TestRepo::new();
        repo.commit_mapping("master", "{oops");
        let engine = MockSearchEngine::new();

        update(&indexer(&repo, &engine)).await;

        assert!(logs_contain("branch reconciliation failed"));
        assert!(logs_contain("malformed-mapping"));
    }
}
