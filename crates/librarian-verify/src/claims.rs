//! Claim extraction: turn a synthesized answer into atomic, checkable
//! assertions.
//!
//! A claim is a short declarative sentence referencing an identifier plus a
//! verb-like relation ("X extends Y", "f returns T", "f is async").
//! Sentences already hedged by the refiner ("likely …", "unverified: …")
//! are not assertions and are skipped — re-verifying a refined answer must
//! not count hedged spans against it.

use librarian_core::identifiers::IdentifierScanner;
use librarian_core::relations::{Relation, RelationMatch, RelationScanner};
use serde::{Deserialize, Serialize};

/// Markers that turn a sentence from an assertion into a hedge.
const HEDGE_MARKERS: &[&str] = &["likely", "unverified:", "possibly", "perhaps", "may be"];

/// What kind of assertion a claim makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Extends,
    Implements,
    Returns,
    HasMethod,
    TakesParameter,
    IsAsync,
    ImportedFrom,
    /// References identifiers without a recognized relation.
    General,
}

impl From<Relation> for ClaimKind {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Extends => Self::Extends,
            Relation::Implements => Self::Implements,
            Relation::Returns => Self::Returns,
            Relation::HasMethod => Self::HasMethod,
            Relation::TakesParameter => Self::TakesParameter,
            Relation::IsAsync => Self::IsAsync,
            Relation::ImportedFrom => Self::ImportedFrom,
        }
    }
}

/// Byte range of a claim within the source answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

/// An atomic checkable assertion extracted from an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub kind: ClaimKind,
    pub span: SourceSpan,
    /// The parsed relation triple, when the claim has one.
    pub relation: Option<RelationMatch>,
}

/// Sentence-level claim extraction.
pub struct ClaimExtractor {
    relations: RelationScanner,
    identifiers: IdentifierScanner,
}

impl ClaimExtractor {
    pub fn new() -> Self {
        Self {
            relations: RelationScanner::new(),
            identifiers: IdentifierScanner::new(),
        }
    }

    /// Extract up to `max_claims` claims from `answer`.
    pub fn extract(&self, answer: &str, max_claims: usize) -> Vec<Claim> {
        let mut claims = Vec::new();
        for (start, end) in split_sentences(answer) {
            if claims.len() >= max_claims {
                break;
            }
            let sentence = answer[start..end].trim();
            if sentence.is_empty() || is_hedged(sentence) {
                continue;
            }
            if let Some(relation) = self.relations.parse(sentence) {
                claims.push(Claim {
                    text: sentence.to_string(),
                    kind: relation.relation.into(),
                    span: SourceSpan { start, end },
                    relation: Some(relation),
                });
            } else if !self.identifiers.extract(sentence).is_empty() && has_assertion_verb(sentence)
            {
                claims.push(Claim {
                    text: sentence.to_string(),
                    kind: ClaimKind::General,
                    span: SourceSpan { start, end },
                    relation: None,
                });
            }
        }
        claims
    }
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hedged(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    HEDGE_MARKERS.iter().any(|m| lower.starts_with(m))
}

fn has_assertion_verb(sentence: &str) -> bool {
    let lower = format!(" {} ", sentence.to_lowercase());
    [
        " is ", " are ", " has ", " have ", " uses ", " calls ", " handles ", " takes ",
        " creates ", " defines ", " contains ", " stores ", " validates ",
    ]
    .iter()
    .any(|v| lower.contains(v))
}

/// Sentence boundaries as byte ranges. Splits on newline, `;`, `!`, `?`,
/// and on `.` only when followed by whitespace or end-of-text — a period
/// inside `user.ts:10` is not a boundary.
fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        let is_break = match b {
            b'\n' | b';' | b'!' | b'?' => true,
            b'.' => i + 1 >= bytes.len() || bytes[i + 1].is_ascii_whitespace(),
            _ => false,
        };
        if is_break {
            if i > start {
                spans.push((start, i));
            }
            start = i + 1;
        }
        i += 1;
    }
    if start < bytes.len() {
        spans.push((start, bytes.len()));
    }
    spans
}
