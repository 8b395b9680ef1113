//! Citation verification against an on-disk repository fixture.

use std::fs;
use std::path::Path;

use librarian_verify::citations::{CitationFailure, CitationVerifier};

fn write_repo(root: &Path) {
    fs::create_dir_all(root.join("src/services")).unwrap();
    fs::write(
        root.join("src/services/user.ts"),
        "import { BaseService } from '../base';\n\
         export class UserService extends BaseService {\n\
         \x20\x20async findUser(id: string): Promise<User> {\n\
         \x20\x20\x20\x20return this.db.find(id);\n\
         \x20\x20}\n\
         }\n",
    )
    .unwrap();
    fs::write(root.join("src/base.ts"), "export class BaseService {}\n").unwrap();
}

// ---- verified citations ----

#[test]
fn existing_file_and_line_verify() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report = CitationVerifier::default().verify_output(
        "UserService is declared at src/services/user.ts:2 and its base at src/base.ts:1.",
        dir.path(),
    );
    assert_eq!(report.total_citations, 2);
    assert_eq!(report.verified_count, 2);
    assert!((report.verification_rate - 1.0).abs() < f64::EPSILON);
}

#[test]
fn bare_file_citation_without_line_verifies() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report = CitationVerifier::default()
        .verify_output("The service lives in `src/services/user.ts`.", dir.path());
    assert_eq!(report.verified_count, 1);
    assert_eq!(report.results[0].citation.line, None);
}

#[test]
fn relative_citation_with_unique_basename_verifies() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report = CitationVerifier::default().verify_output("See user.ts:3.", dir.path());
    assert!(report.results[0].verified);
}

// ---- failures ----

#[test]
fn line_far_past_eof_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let line_count = fs::read_to_string(dir.path().join("src/base.ts"))
        .unwrap()
        .lines()
        .count();
    let answer = format!("BaseService is at src/base.ts:{}.", line_count + 100_000);
    let report = CitationVerifier::default().verify_output(&answer, dir.path());
    assert_eq!(report.failed_count, 1);
    assert_eq!(
        report.results[0].reason,
        Some(CitationFailure::LineOutOfRange)
    );
}

#[test]
fn citation_to_missing_file_is_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report =
        CitationVerifier::default().verify_output("Defined in src/ghost.ts:4.", dir.path());
    assert_eq!(report.results[0].reason, Some(CitationFailure::FileNotFound));
    assert!(report.verification_rate < f64::EPSILON);
}

#[test]
fn basename_matching_several_files_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    fs::create_dir_all(dir.path().join("test")).unwrap();
    fs::write(dir.path().join("test/user.ts"), "test double\n").unwrap();
    let report = CitationVerifier::default().verify_output("See user.ts:1.", dir.path());
    assert_eq!(report.results[0].reason, Some(CitationFailure::AmbiguousPath));
}

// ---- rate semantics ----

#[test]
fn answer_without_citations_has_rate_one() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report = CitationVerifier::default()
        .verify_output("UserService extends BaseService and nothing is cited.", dir.path());
    assert_eq!(report.total_citations, 0);
    assert!((report.verification_rate - 1.0).abs() < f64::EPSILON);
}

#[test]
fn mixed_answers_report_a_fractional_rate() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path());
    let report = CitationVerifier::default().verify_output(
        "Good: src/base.ts:1. Bad: src/ghost.ts:9.",
        dir.path(),
    );
    assert_eq!(report.total_citations, 2);
    assert!((report.verification_rate - 0.5).abs() < f64::EPSILON);
}
