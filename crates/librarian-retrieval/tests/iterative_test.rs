//! Iterative Retriever integration tests: stopping rules, degenerate
//! configs, determinism, and corpus-absence handling.

use std::fs;

use librarian_core::config::IterativeConfig;
use librarian_core::store::MemoryFactStore;
use librarian_retrieval::iterative::{IterativeRetriever, StopReason};

/// Helper: a small two-service corpus on disk.
fn corpus() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/services")).unwrap();
    fs::write(
        dir.path().join("src/app.ts"),
        "import { UserService } from './services/user'\nconst svc = new UserService()\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/services/user.ts"),
        "import { BaseService } from './base'\nexport class UserService extends BaseService {\n  findUser(id) {}\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/services/base.ts"),
        "export class BaseService {\n  connect() {}\n}\n",
    )
    .unwrap();
    dir
}

// ---- Degenerate configs ----

#[test]
fn max_rounds_zero_yields_zero_rounds() {
    let dir = corpus();
    let retriever = IterativeRetriever::new(IterativeConfig {
        max_rounds: 0,
        ..IterativeConfig::default()
    });
    let result = retriever.retrieve_from_root("Agent", dir.path());
    assert_eq!(result.rounds.len(), 0);
    assert!(result.final_results.is_empty());
    assert_eq!(result.stop_reason, StopReason::MaxRounds);
}

#[test]
fn nonexistent_corpus_root_is_empty_not_error() {
    let retriever = IterativeRetriever::default();
    let result = retriever.retrieve_from_root("UserService", "/no/such/corpus");
    assert!(result.rounds.is_empty());
    assert!(result.final_results.is_empty());
    assert_eq!(result.stop_reason, StopReason::EmptyCorpus);
}

#[test]
fn empty_query_degrades_to_empty_result() {
    let dir = corpus();
    let retriever = IterativeRetriever::default();
    let result = retriever.retrieve_from_root("", dir.path());
    assert!(result.rounds.is_empty());
    assert_eq!(result.stop_reason, StopReason::QueryExhausted);
}

// ---- Stopping rules ----

#[test]
fn stops_at_max_rounds_when_gain_check_disabled() {
    let dir = corpus();
    let retriever = IterativeRetriever::new(IterativeConfig {
        max_rounds: 4,
        // Negative gain threshold: every round passes the gain check.
        min_coverage_gain: -1.0,
        ..IterativeConfig::default()
    });
    let result = retriever.retrieve_from_root("UserService", dir.path());
    assert!(matches!(
        result.stop_reason,
        StopReason::MaxRounds | StopReason::QueryExhausted
    ));
    assert!(result.rounds.len() <= 4);
}

#[test]
fn stops_on_low_coverage_gain() {
    let dir = corpus();
    let retriever = IterativeRetriever::new(IterativeConfig {
        max_rounds: 10,
        min_coverage_gain: 0.05,
        ..IterativeConfig::default()
    });
    let result = retriever.retrieve_from_root("UserService", dir.path());
    // A tiny corpus saturates quickly; the loop must not run all 10 rounds.
    assert!(result.rounds.len() < 10);
}

// ---- Discovery ----

#[test]
fn discovers_terms_and_chases_imports() {
    let dir = corpus();
    let retriever = IterativeRetriever::default();
    let result = retriever.retrieve_from_root("UserService", dir.path());

    assert!(
        result.terms_discovered.iter().any(|t| t == "BaseService"),
        "expansion should discover BaseService, got {:?}",
        result.terms_discovered
    );
    assert!(
        result
            .files_explored
            .iter()
            .any(|f| f.ends_with("services/base.ts")),
        "chasing should reach base.ts via './base', got {:?}",
        result.files_explored
    );
}

#[test]
fn chasing_disabled_does_not_follow_imports() {
    let retriever = IterativeRetriever::new(IterativeConfig {
        cross_file_chasing: false,
        term_expansion: false,
        ..IterativeConfig::default()
    });
    let store = MemoryFactStore::new()
        .with_file("src/app.ts", "import { Thing } from './thing'\nuse Widget here")
        .with_file("src/thing.ts", "export class Thing {}");
    let result = retriever.retrieve("Widget", &store);
    assert!(result.files_explored.iter().all(|f| f != "src/thing.ts"));
}

// ---- Determinism ----

#[test]
fn rerun_on_unchanged_corpus_is_identical() {
    let dir = corpus();
    let retriever = IterativeRetriever::default();
    let first = retriever.retrieve_from_root("UserService", dir.path());
    let second = retriever.retrieve_from_root("UserService", dir.path());

    assert_eq!(first.rounds.len(), second.rounds.len());
    assert_eq!(first.terms_discovered, second.terms_discovered);
    assert_eq!(first.files_explored, second.files_explored);
    let files = |r: &librarian_retrieval::IterativeRetrievalResult| {
        r.final_results.iter().map(|i| i.file.clone()).collect::<Vec<_>>()
    };
    assert_eq!(files(&first), files(&second));
}

// ---- Report shape ----

#[test]
fn report_serializes_to_json() {
    let dir = corpus();
    let retriever = IterativeRetriever::default();
    let result = retriever.retrieve_from_root("UserService", dir.path());
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["rounds"].is_array());
    assert!(json["total_coverage"].is_number());
    assert_eq!(json["query"], "UserService");
}
