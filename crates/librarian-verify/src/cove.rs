//! Chain-of-verification refinement.
//!
//! An answer goes through the full verification stack — claim extraction,
//! citation checks, grounding scores, entailment — and every claim that
//! fails is hedged or removed in place. Hedged claims are skipped by the
//! claim extractor on a second pass, so refinement can only lower the
//! measured non-entailed rate, never raise it.

use std::path::Path;

use librarian_core::config::VerificationConfig;
use librarian_core::facts::Fact;
use librarian_core::store::MemoryFactStore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::citations::{CitationVerificationReport, CitationVerifier};
use crate::claims::{Claim, SourceSpan};
use crate::entailment::{EntailmentChecker, EntailmentLabel, EntailmentReport};
use crate::minicheck::{MiniCheckScore, MiniCheckScorer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Modification {
    /// Claim text prefixed with a hedge marker.
    Hedged { claim: String, hedge: String },
    /// Claim text removed from the answer.
    Removed { claim: String },
    /// A citation in the claim failed verification; text left intact.
    CitationFlagged { claim: String, citation: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedResponse {
    pub original: String,
    pub refined: String,
    pub verification_questions: Vec<String>,
    pub modifications: Vec<Modification>,
    pub citation_report: CitationVerificationReport,
    pub grounding: MiniCheckScore,
    pub entailment: EntailmentReport,
    /// Non-entailed rate of the original answer.
    pub before_rate: f64,
    /// Non-entailed rate of the refined answer, re-measured.
    pub after_rate: f64,
}

/// Runs the verification stack over an answer and rewrites it.
pub struct CoveRefiner {
    config: VerificationConfig,
    citations: CitationVerifier,
    scorer: MiniCheckScorer,
    checker: EntailmentChecker,
}

impl CoveRefiner {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            citations: CitationVerifier::new(config.clone()),
            scorer: MiniCheckScorer::new(config.clone()),
            checker: EntailmentChecker::new(config.clone()),
            config,
        }
    }

    /// Verify `answer` against the repository at `repo_root` plus the
    /// facts already collected for it, and rewrite failing claims.
    pub fn verify(&self, answer: &str, repo_root: impl AsRef<Path>, facts: &[Fact]) -> VerifiedResponse {
        // Rendered facts double as the store's searchable text, so subject
        // search leads back to the file whose facts to check.
        let mut per_file: FxHashMap<&str, String> = FxHashMap::default();
        let mut store = MemoryFactStore::new();
        let mut evidence = Vec::with_capacity(facts.len());
        for fact in facts {
            let rendered = format!("{} ({})", fact.render(), fact.location());
            per_file
                .entry(fact.file.as_str())
                .or_default()
                .push_str(&format!("{rendered}\n"));
            evidence.push(rendered);
            store = store.with_fact(fact.clone());
        }
        for (file, text) in per_file {
            store = store.with_file(file, text);
        }

        let citation_report = self.citations.verify_output(answer, &repo_root);
        let grounding = self.scorer.score(answer, &evidence);
        let entailment = self.checker.check_with_store(answer, &store);
        let before_rate = entailment.non_entailed_rate();

        let verification_questions = entailment
            .claims
            .iter()
            .take(self.config.max_verification_questions)
            .map(|checked| format!("Does the codebase confirm that {}?", checked.claim.text))
            .collect();

        let mut modifications = Vec::new();
        for failed in citation_report.results.iter().filter(|r| !r.verified) {
            if let Some(claim) = claim_containing_citation(&entailment, &failed.citation.file) {
                modifications.push(Modification::CitationFlagged {
                    claim: claim.text.clone(),
                    citation: match failed.citation.line {
                        Some(line) => format!("{}:{line}", failed.citation.file),
                        None => failed.citation.file.clone(),
                    },
                });
            }
        }

        let refined = self.rewrite(answer, &grounding, &entailment, &mut modifications);

        // Hedged text drops out of claim extraction, so this can only
        // shrink the measured claim set.
        let after_rate = self
            .checker
            .check_with_store(&refined, &store)
            .non_entailed_rate();

        info!(
            claims = entailment.claims.len(),
            modifications = modifications.len(),
            before_rate,
            after_rate,
            "answer refined"
        );
        VerifiedResponse {
            original: answer.to_string(),
            refined,
            verification_questions,
            modifications,
            citation_report,
            grounding,
            entailment,
            before_rate,
            after_rate,
        }
    }

    /// Hedge or remove every claim that is not entailed or scores below
    /// the hedge threshold, editing from the end of the answer backwards
    /// so earlier spans stay valid. Hedging both sets keeps every claim
    /// surviving refinement entailed, which is what makes the
    /// post-refinement rate never worse than the pre-refinement one.
    fn rewrite(
        &self,
        answer: &str,
        grounding: &MiniCheckScore,
        entailment: &EntailmentReport,
        modifications: &mut Vec<Modification>,
    ) -> String {
        let mut edits: Vec<(SourceSpan, &Claim, f64)> = Vec::new();
        for checked in &entailment.claims {
            let score = grounding
                .claim_scores
                .iter()
                .find(|cs| cs.claim.span == checked.claim.span)
                .map(|cs| cs.score)
                .unwrap_or(0.0);
            if checked.label == EntailmentLabel::Entailed && score >= self.config.hedge_threshold {
                continue;
            }
            edits.push((checked.claim.span, &checked.claim, score));
        }
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut refined = answer.to_string();
        for (span, claim, score) in edits {
            if span.end > refined.len() {
                continue;
            }
            if self.config.remove_unverified {
                refined.replace_range(span.start..span.end, "");
                modifications.push(Modification::Removed {
                    claim: claim.text.clone(),
                });
            } else if self.config.hedge_low_confidence {
                let hedge = if score < self.config.hedge_threshold / 2.0 {
                    "unverified: "
                } else {
                    "likely "
                };
                // Spans keep leading whitespace; hedge goes before the text.
                let text_start = span.start
                    + refined[span.start..span.end]
                        .find(|c: char| !c.is_whitespace())
                        .unwrap_or(0);
                refined.insert_str(text_start, hedge);
                modifications.push(Modification::Hedged {
                    claim: claim.text.clone(),
                    hedge: hedge.trim_end().to_string(),
                });
            }
        }
        refined
    }
}

impl Default for CoveRefiner {
    fn default() -> Self {
        Self::new(VerificationConfig::default())
    }
}

fn claim_containing_citation<'a>(report: &'a EntailmentReport, file: &str) -> Option<&'a Claim> {
    report
        .claims
        .iter()
        .map(|checked| &checked.claim)
        .find(|claim| claim.text.contains(file))
}
