//! Citation verification against the real file system.
//!
//! Citations are `path/like/file.ext:line` spans (and bare file paths)
//! inside an answer. A citation to a file that does not exist, or to a
//! line past the end of the file, is itself the signal being measured —
//! missing files are typed results, never errors.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use librarian_core::config::VerificationConfig;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A parsed citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub file: String,
    pub line: Option<u32>,
}

/// Why a citation failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationFailure {
    FileNotFound,
    LineOutOfRange,
    AmbiguousPath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationVerificationResult {
    pub citation: Citation,
    pub verified: bool,
    pub reason: Option<CitationFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationVerificationReport {
    pub total_citations: usize,
    pub verified_count: usize,
    pub failed_count: usize,
    /// verified / total; 1.0 with zero citations (vacuously verified).
    pub verification_rate: f64,
    pub results: Vec<CitationVerificationResult>,
}

impl CitationVerificationReport {
    pub fn empty() -> Self {
        Self {
            total_citations: 0,
            verified_count: 0,
            failed_count: 0,
            verification_rate: 1.0,
            results: Vec::new(),
        }
    }
}

/// Parses citations out of answer text and checks them on disk.
pub struct CitationVerifier {
    citation: Regex,
    config: VerificationConfig,
}

impl CitationVerifier {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            // path/with.ext or path/with.ext:42, optionally backticked or
            // parenthesized. Extension keeps 'word.Word' prose out.
            citation: Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_./-]*\.[a-z]{1,4}(?::(\d+))?").unwrap(),
            config,
        }
    }

    /// Parse and verify every citation in `answer` against `repo_root`.
    pub fn verify_output(&self, answer: &str, repo_root: impl AsRef<Path>) -> CitationVerificationReport {
        let repo_root = repo_root.as_ref();
        let citations = self.parse_citations(answer);
        let mut results = Vec::with_capacity(citations.len());
        for citation in citations {
            results.push(self.verify_one(&citation, repo_root));
        }
        let verified_count = results.iter().filter(|r| r.verified).count();
        let total = results.len();
        let report = CitationVerificationReport {
            total_citations: total,
            verified_count,
            failed_count: total - verified_count,
            verification_rate: if total == 0 {
                1.0
            } else {
                verified_count as f64 / total as f64
            },
            results,
        };
        debug!(
            total = report.total_citations,
            verified = report.verified_count,
            "citation verification complete"
        );
        report
    }

    /// All distinct citations in the answer, in order of appearance.
    pub fn parse_citations(&self, answer: &str) -> Vec<Citation> {
        let mut out = Vec::new();
        let mut seen: FxHashSet<(String, Option<u32>)> = FxHashSet::default();
        for cap in self.citation.captures_iter(answer) {
            if out.len() >= self.config.max_citations {
                break;
            }
            let whole = cap.get(0).unwrap().as_str();
            let (file, line) = match whole.rsplit_once(':') {
                Some((file, line_str)) => (file, line_str.parse::<u32>().ok()),
                None => (whole, None),
            };
            let file = file.trim_matches(['`', '(', ')', ',']).to_string();
            if !looks_like_path(&file) {
                continue;
            }
            if seen.insert((file.clone(), line)) {
                out.push(Citation { file, line });
            }
        }
        out
    }

    fn verify_one(&self, citation: &Citation, repo_root: &Path) -> CitationVerificationResult {
        let resolved = match resolve_citation(repo_root, &citation.file) {
            Resolved::Unique(path) => path,
            Resolved::Missing => {
                return CitationVerificationResult {
                    citation: citation.clone(),
                    verified: false,
                    reason: Some(CitationFailure::FileNotFound),
                };
            }
            Resolved::Ambiguous => {
                return CitationVerificationResult {
                    citation: citation.clone(),
                    verified: false,
                    reason: Some(CitationFailure::AmbiguousPath),
                };
            }
        };
        if let Some(line) = citation.line {
            let line_count = std::fs::read_to_string(&resolved)
                .map(|c| c.lines().count())
                .unwrap_or(0);
            if line as usize > line_count || line == 0 {
                return CitationVerificationResult {
                    citation: citation.clone(),
                    verified: false,
                    reason: Some(CitationFailure::LineOutOfRange),
                };
            }
        }
        CitationVerificationResult {
            citation: citation.clone(),
            verified: true,
            reason: None,
        }
    }
}

impl Default for CitationVerifier {
    fn default() -> Self {
        Self::new(VerificationConfig::default())
    }
}

/// Filter obvious non-paths the extension regex lets through
/// (version strings, lone extensions).
fn looks_like_path(file: &str) -> bool {
    let Some((stem, ext)) = file.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && !ext.is_empty() && !ext.chars().any(|c| c.is_ascii_digit())
}

enum Resolved {
    Unique(PathBuf),
    Missing,
    Ambiguous,
}

/// Resolve a cited path: exact join first, then a basename search under
/// the root. A unique basename match verifies; several matches are
/// ambiguous.
fn resolve_citation(repo_root: &Path, cited: &str) -> Resolved {
    let exact = repo_root.join(cited);
    if exact.is_file() {
        return Resolved::Unique(exact);
    }
    let Some(basename) = Path::new(cited).file_name() else {
        return Resolved::Missing;
    };
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in WalkBuilder::new(repo_root).hidden(true).build().flatten() {
        if entry.file_type().is_some_and(|t| t.is_file()) && entry.path().file_name() == Some(basename)
        {
            matches.push(entry.into_path());
            if matches.len() > 1 {
                return Resolved::Ambiguous;
            }
        }
    }
    match matches.pop() {
        Some(path) => Resolved::Unique(path),
        None => Resolved::Missing,
    }
}
