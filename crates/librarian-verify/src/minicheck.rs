//! Claim-level grounding scorer.
//!
//! Each claim in an answer is scored against every evidence snippet; a
//! claim's score is the best any single snippet gives it. A snippet with
//! no identifier overlap scores zero no matter what else it says.

use librarian_core::config::VerificationConfig;
use librarian_core::identifiers::IdentifierScanner;
use librarian_core::relations::RelationScanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::{Claim, ClaimExtractor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimScore {
    pub claim: Claim,
    pub score: f64,
    pub grounded: bool,
    /// The snippet that best supports this claim, when any scored above
    /// the evidence floor.
    pub best_evidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniCheckScore {
    /// Mean claim score; 1.0 when the answer makes no claims.
    pub grounding_score: f64,
    pub is_grounded: bool,
    pub claim_scores: Vec<ClaimScore>,
}

/// Scores answer claims against evidence snippets.
pub struct MiniCheckScorer {
    config: VerificationConfig,
    extractor: ClaimExtractor,
    identifiers: IdentifierScanner,
    relations: RelationScanner,
}

impl MiniCheckScorer {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            extractor: ClaimExtractor::new(),
            identifiers: IdentifierScanner::new(),
            relations: RelationScanner::new(),
            config,
        }
    }

    /// Score every claim in `answer` against `evidence` snippets.
    pub fn score(&self, answer: &str, evidence: &[String]) -> MiniCheckScore {
        let claims = self.extractor.extract(answer, self.config.max_claims);
        self.score_claims(claims, evidence)
    }

    pub fn score_claims(&self, claims: Vec<Claim>, evidence: &[String]) -> MiniCheckScore {
        if claims.is_empty() {
            // Nothing asserted, nothing to hallucinate.
            return MiniCheckScore {
                grounding_score: 1.0,
                is_grounded: true,
                claim_scores: Vec::new(),
            };
        }
        let claim_scores: Vec<ClaimScore> = claims
            .into_iter()
            .map(|claim| self.score_claim(claim, evidence))
            .collect();
        let grounding_score = claim_scores.iter().map(|c| c.score).sum::<f64>()
            / claim_scores.len() as f64;
        debug!(
            claims = claim_scores.len(),
            score = grounding_score,
            "grounding scored"
        );
        MiniCheckScore {
            grounding_score,
            is_grounded: grounding_score >= self.config.grounding_threshold,
            claim_scores,
        }
    }

    /// Score a single claim against the evidence set.
    pub fn score_claim(&self, claim: Claim, evidence: &[String]) -> ClaimScore {
        let mut best = 0.0_f64;
        let mut best_evidence: Option<&String> = None;
        for snippet in evidence {
            let score = self.snippet_score(&claim, snippet);
            if score > best {
                best = score;
                best_evidence = Some(snippet);
            }
        }
        ClaimScore {
            grounded: best >= self.config.grounding_threshold,
            best_evidence: if best >= self.config.best_evidence_floor {
                best_evidence.cloned()
            } else {
                None
            },
            score: best,
            claim,
        }
    }

    /// exact_match_weight * identifier overlap + relation_weight when the
    /// snippet expresses the claim's relation. Zero overlap zeroes the
    /// whole score.
    fn snippet_score(&self, claim: &Claim, snippet: &str) -> f64 {
        let claim_idents = self.identifiers.extract(&claim.text);
        if claim_idents.is_empty() {
            return 0.0;
        }
        let snippet_lower = snippet.to_lowercase();
        let matched = claim_idents
            .iter()
            .filter(|ident| snippet_lower.contains(&ident.to_lowercase()))
            .count();
        if matched == 0 {
            return 0.0;
        }
        let overlap = matched as f64 / claim_idents.len() as f64;
        let mut score = self.config.exact_match_weight * overlap;
        if let Some(relation) = &claim.relation {
            if self.relations.evidence_expresses(relation, snippet) {
                score += self.config.relation_weight;
            }
        }
        score.min(1.0)
    }
}

impl Default for MiniCheckScorer {
    fn default() -> Self {
        Self::new(VerificationConfig::default())
    }
}
