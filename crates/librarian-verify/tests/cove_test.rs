//! Chain-of-verification refinement end to end.

use std::fs;
use std::path::Path;

use librarian_core::config::VerificationConfig;
use librarian_core::errors::LibrarianResult;
use librarian_core::facts::{Fact, FactKind};
use librarian_verify::cove::{CoveRefiner, Modification};
use librarian_verify::probing::ProbeRunner;

fn repo_facts() -> Vec<Fact> {
    vec![
        Fact::new(
            "UserService",
            "src/services/user.ts",
            2,
            FactKind::Class {
                extends: Some("BaseService".to_string()),
                implements: vec!["Disposable".to_string()],
                methods: vec!["findUser".to_string()],
            },
        ),
        Fact::new(
            "findUser",
            "src/services/user.ts",
            3,
            FactKind::FunctionDef {
                return_type: Some("Promise<User>".to_string()),
                parameters: vec!["id".to_string()],
                is_async: true,
            },
        ),
    ]
}

fn write_repo(root: &Path) {
    fs::create_dir_all(root.join("src/services")).unwrap();
    fs::write(
        root.join("src/services/user.ts"),
        "import { BaseService } from '../base';\n\
         export class UserService extends BaseService implements Disposable {\n\
         \x20\x20async findUser(id: string): Promise<User> {}\n\
         }\n",
    )
    .unwrap();
    fs::write(root.join("src/base.ts"), "export class BaseService {}\n").unwrap();
}

// ---- refinement output ----

#[test]
fn accurate_answer_passes_through_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let answer = "UserService extends BaseService. findUser is async.";
    let response = CoveRefiner::default().verify(answer, dir.path(), &repo_facts());
    assert_eq!(response.refined, answer);
    assert!(response.modifications.is_empty());
    assert_eq!(response.before_rate, 0.0);
    assert_eq!(response.after_rate, 0.0);
}

#[test]
fn contradicted_claim_gets_hedged() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let answer = "UserService extends OrderQueue.";
    let response = CoveRefiner::default().verify(answer, dir.path(), &repo_facts());
    assert_ne!(response.refined, answer);
    assert!(response.refined.contains("UserService extends OrderQueue"));
    assert!(
        response.refined.starts_with("unverified: ") || response.refined.starts_with("likely "),
        "refined: {}",
        response.refined
    );
    assert!(matches!(
        response.modifications.as_slice(),
        [Modification::Hedged { .. }]
    ));
}

#[test]
fn remove_unverified_drops_the_claim_text() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let config = VerificationConfig {
        remove_unverified: true,
        ..VerificationConfig::default()
    };
    let answer = "UserService extends BaseService. UserService extends OrderQueue.";
    let response = CoveRefiner::new(config).verify(answer, dir.path(), &repo_facts());
    assert!(!response.refined.contains("OrderQueue"));
    assert!(response.refined.contains("UserService extends BaseService"));
    assert!(matches!(
        response.modifications.as_slice(),
        [Modification::Removed { .. }]
    ));
}

#[test]
fn failed_citations_are_flagged_on_their_claims() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let answer = "UserService is defined in src/ghost.ts:4.";
    let response = CoveRefiner::default().verify(answer, dir.path(), &repo_facts());
    assert!(response
        .modifications
        .iter()
        .any(|m| matches!(m, Modification::CitationFlagged { citation, .. } if citation == "src/ghost.ts:4")));
}

#[test]
fn verification_questions_cover_each_claim() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let answer = "UserService extends BaseService. findUser returns a Promise<User>.";
    let response = CoveRefiner::default().verify(answer, dir.path(), &repo_facts());
    assert_eq!(response.verification_questions.len(), 2);
    for question in &response.verification_questions {
        assert!(question.starts_with("Does the codebase confirm that "));
    }
}

// ---- the refinement invariant ----

#[test]
fn refinement_never_raises_the_non_entailed_rate() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let refiner = CoveRefiner::default();
    let answers = [
        "UserService extends BaseService.",
        "UserService extends OrderQueue.",
        "UserService extends OrderQueue. findUser is async. ghostFn returns a Widget.",
        "No claims at all in this one.",
    ];
    for answer in answers {
        let response = refiner.verify(answer, dir.path(), &repo_facts());
        assert!(
            response.after_rate <= response.before_rate + 1e-9,
            "answer {:?}: before {} after {}",
            answer,
            response.before_rate,
            response.after_rate
        );
    }
}

#[test]
fn probe_run_reports_improved_rates() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let runner = ProbeRunner::new(VerificationConfig::default(), dir.path());
    let provider = |question: &str| -> LibrarianResult<String> {
        if question.contains("base class") {
            Ok("UserService extends BaseService.".to_string())
        } else {
            Ok("UserService extends OrderQueue. findUser returns a WidgetHandle.".to_string())
        }
    };
    let probes = vec![
        "What is the base class of UserService?".to_string(),
        "What does findUser return?".to_string(),
    ];
    let report = runner.run(&probes, &provider, &repo_facts());
    assert_eq!(report.answered, 2);
    assert!(report.before_rate > 0.0);
    assert!(report.after_rate <= report.before_rate + 1e-9);
}

// ---- serialization ----

#[test]
fn verified_response_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let response = CoveRefiner::default().verify(
        "UserService extends OrderQueue.",
        dir.path(),
        &repo_facts(),
    );
    let json = serde_json::to_value(&response).unwrap();
    assert!(json["before_rate"].as_f64().is_some());
    assert!(json["modifications"][0]["action"].is_string());
}
