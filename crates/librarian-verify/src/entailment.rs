//! Three-way entailment checking of claims against typed facts.
//!
//! A claim is `entailed` when a fact supports its relation, `contradicted`
//! when a fact exists for the same subject but carries a different
//! relation value, and `neutral` when no fact covers the subject at all.
//! The split is deliberate: collapsing contradicted into neutral hides
//! real hallucinations, collapsing neutral into contradicted penalizes
//! claims about code the extractor never saw.

use std::path::Path;

use librarian_core::config::VerificationConfig;
use librarian_core::facts::{Fact, FactKind};
use librarian_core::relations::{objects_compatible, Relation, RelationMatch};
use librarian_core::store::{DirFactStore, EvidenceCache, FactStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::{Claim, ClaimExtractor};

/// Files consulted per claim subject.
const FILES_PER_SUBJECT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntailmentLabel {
    Entailed,
    Contradicted,
    Neutral,
}

/// One claim with its label and the evidence that decided it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckedClaim {
    pub claim: Claim,
    pub label: EntailmentLabel,
    /// Rendered fact (with location) that entailed or contradicted the
    /// claim; `None` for neutral claims.
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntailmentSummary {
    pub entailed: usize,
    pub contradicted: usize,
    pub neutral: usize,
    /// entailed / total; 1.0 with zero claims (nothing asserted).
    pub entailment_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntailmentReport {
    pub claims: Vec<CheckedClaim>,
    pub summary: EntailmentSummary,
}

impl EntailmentReport {
    /// Fraction of claims that are not entailed (the measured
    /// hallucination-rate numerator for an answer).
    pub fn non_entailed_rate(&self) -> f64 {
        if self.claims.is_empty() {
            return 0.0;
        }
        1.0 - self.summary.entailment_rate
    }
}

/// Claim extraction plus fact lookup plus labeling.
pub struct EntailmentChecker {
    extractor: ClaimExtractor,
    config: VerificationConfig,
}

impl EntailmentChecker {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            extractor: ClaimExtractor::new(),
            config,
        }
    }

    /// Check an answer against evidence rooted at `evidence_root`
    /// (directory-backed store; a missing root yields all-neutral labels).
    pub fn check_response(&self, answer: &str, evidence_root: impl AsRef<Path>) -> EntailmentReport {
        let store = DirFactStore::open(evidence_root);
        self.check_with_store(answer, &store)
    }

    /// Check an answer against an arbitrary fact store.
    pub fn check_with_store(&self, answer: &str, store: &dyn FactStore) -> EntailmentReport {
        let claims = self.extractor.extract(answer, self.config.max_claims);
        let mut cache = EvidenceCache::new();
        let mut checked = Vec::with_capacity(claims.len());
        for claim in claims {
            let (label, evidence) = self.label_claim(&claim, store, &mut cache);
            checked.push(CheckedClaim {
                claim,
                label,
                evidence,
            });
        }
        let report = summarize(checked);
        debug!(
            entailed = report.summary.entailed,
            contradicted = report.summary.contradicted,
            neutral = report.summary.neutral,
            "entailment check complete"
        );
        report
    }

    fn label_claim(
        &self,
        claim: &Claim,
        store: &dyn FactStore,
        cache: &mut EvidenceCache,
    ) -> (EntailmentLabel, Option<String>) {
        let relation = match &claim.relation {
            Some(m) => m,
            None => {
                return self.label_general_claim(claim, store, cache);
            }
        };
        let facts = self.subject_facts(&relation.subject, store, cache);
        if facts.is_empty() {
            // No fact found — genuinely unknown, not assumed false.
            return (EntailmentLabel::Neutral, None);
        }
        let mut contradiction: Option<String> = None;
        for fact in &facts {
            match relation_against_fact(relation, fact) {
                FactVerdict::Supports => {
                    return (
                        EntailmentLabel::Entailed,
                        Some(format!("{} ({})", fact.render(), fact.location())),
                    );
                }
                FactVerdict::Conflicts => {
                    contradiction
                        .get_or_insert_with(|| format!("{} ({})", fact.render(), fact.location()));
                }
                FactVerdict::Silent => {}
            }
        }
        match contradiction {
            Some(evidence) => (EntailmentLabel::Contradicted, Some(evidence)),
            None => (EntailmentLabel::Neutral, None),
        }
    }

    /// A general claim is entailed when some fact about any of its
    /// identifiers renders to text covering the subject; never
    /// contradicted (there is no specific value to conflict with).
    fn label_general_claim(
        &self,
        claim: &Claim,
        store: &dyn FactStore,
        cache: &mut EvidenceCache,
    ) -> (EntailmentLabel, Option<String>) {
        let terms = librarian_core::identifiers::extract(&claim.text);
        for term in &terms {
            let facts = self.subject_facts(term, store, cache);
            if let Some(fact) = facts.first() {
                return (
                    EntailmentLabel::Entailed,
                    Some(format!("{} ({})", fact.render(), fact.location())),
                );
            }
        }
        (EntailmentLabel::Neutral, None)
    }

    /// Facts whose identifier matches `subject` (case-insensitive), drawn
    /// from the top search hits for the subject.
    fn subject_facts(
        &self,
        subject: &str,
        store: &dyn FactStore,
        cache: &mut EvidenceCache,
    ) -> Vec<Fact> {
        let subject_lower = subject.to_lowercase();
        let mut out = Vec::new();
        let hits = store.search(subject);
        for item in hits.iter().take(FILES_PER_SUBJECT) {
            for fact in cache.facts_for(store, &item.file) {
                if fact.identifier.to_lowercase() == subject_lower {
                    out.push(fact.clone());
                }
            }
        }
        out
    }
}

enum FactVerdict {
    Supports,
    Conflicts,
    Silent,
}

/// Does `fact` support, conflict with, or stay silent on the claimed
/// relation? Only facts about the claim's subject reach this point.
fn relation_against_fact(claim: &RelationMatch, fact: &Fact) -> FactVerdict {
    let object = claim.object.as_deref().unwrap_or("");
    let object_lower = object.to_lowercase();
    let compatible = |value: &str| objects_compatible(&value.to_lowercase(), &object_lower);

    match (claim.relation, &fact.kind) {
        (Relation::Extends, FactKind::Class { extends, .. }) => match extends {
            Some(base) if compatible(base) => FactVerdict::Supports,
            // The class fact exists with a different (or no) base.
            _ => FactVerdict::Conflicts,
        },
        (Relation::Implements, FactKind::Class { implements, .. }) => {
            if implements.iter().any(|i| compatible(i)) {
                FactVerdict::Supports
            } else {
                FactVerdict::Conflicts
            }
        }
        (Relation::HasMethod, FactKind::Class { methods, .. }) => {
            if methods.iter().any(|m| m.to_lowercase() == object_lower) {
                FactVerdict::Supports
            } else {
                FactVerdict::Conflicts
            }
        }
        (Relation::Returns, FactKind::FunctionDef { return_type, .. }) => match return_type {
            Some(ret) if compatible(ret) => FactVerdict::Supports,
            Some(_) => FactVerdict::Conflicts,
            // Untyped function — unknown, not false.
            None => FactVerdict::Silent,
        },
        (Relation::TakesParameter, FactKind::FunctionDef { parameters, .. }) => {
            if parameters.iter().any(|p| p.to_lowercase() == object_lower) {
                FactVerdict::Supports
            } else {
                FactVerdict::Conflicts
            }
        }
        (Relation::IsAsync, FactKind::FunctionDef { is_async, .. }) => {
            if *is_async {
                FactVerdict::Supports
            } else {
                FactVerdict::Conflicts
            }
        }
        (Relation::ImportedFrom, FactKind::Import { source, names }) => {
            let named = names.iter().any(|n| n.to_lowercase() == claim.subject.to_lowercase())
                || fact.identifier.to_lowercase() == claim.subject.to_lowercase();
            if !named {
                FactVerdict::Silent
            } else if compatible(source) {
                FactVerdict::Supports
            } else {
                FactVerdict::Conflicts
            }
        }
        _ => FactVerdict::Silent,
    }
}

fn summarize(checked: Vec<CheckedClaim>) -> EntailmentReport {
    let entailed = checked.iter().filter(|c| c.label == EntailmentLabel::Entailed).count();
    let contradicted = checked
        .iter()
        .filter(|c| c.label == EntailmentLabel::Contradicted)
        .count();
    let neutral = checked.iter().filter(|c| c.label == EntailmentLabel::Neutral).count();
    let total = checked.len();
    let entailment_rate = if total == 0 {
        1.0
    } else {
        entailed as f64 / total as f64
    };
    EntailmentReport {
        claims: checked,
        summary: EntailmentSummary {
            entailed,
            contradicted,
            neutral,
            entailment_rate,
        },
    }
}
