//! LibrarianConfig: all settings from librarian.toml.
//!
//! Every field has a serde default so a partial file (or no file at all)
//! degrades to the documented defaults. Edge values are valid inputs, not
//! errors: `max_rounds = 0` means zero retrieval rounds, a negative
//! `min_coverage_gain` disables early stopping.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::LibrarianResult;

/// Iterative Retriever settings (`[retrieval]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeConfig {
    /// Maximum retrieval rounds. 0 is a valid degenerate input.
    pub max_rounds: usize,
    /// Stop when a round's coverage gain falls below this. Negative
    /// disables early stopping.
    pub min_coverage_gain: f64,
    /// Merge newly discovered identifiers into the next round's query.
    pub term_expansion: bool,
    /// Follow import/export specifiers in matched files.
    pub cross_file_chasing: bool,
    /// Cap on new terms merged into the next query per round.
    pub max_expansion_terms: usize,
    /// Cap on total terms in an expanded query.
    pub max_query_terms: usize,
}

impl Default for IterativeConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            min_coverage_gain: 0.05,
            term_expansion: true,
            cross_file_chasing: true,
            max_expansion_terms: 5,
            max_query_terms: 12,
        }
    }
}

/// Active (confidence-triggered) Retriever settings (`[active]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveConfig {
    /// A token needs retrieval iff its confidence is strictly below this.
    pub confidence_threshold: f64,
    /// Lookahead window for `should_retrieve`. 0 inspects only the
    /// current position.
    pub window_size: usize,
    /// Minimum token gap since the last retrieval before another may fire.
    pub min_retrieval_gap: usize,
    /// Cap on the generated query's length in characters.
    pub max_query_length: usize,
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            window_size: 3,
            min_retrieval_gap: 10,
            max_query_length: 200,
        }
    }
}

/// Verification settings (`[verification]` section): MiniCheck weights,
/// entailment caps, and Chain-of-Verification behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Weight of exact identifier overlap in per-claim scores.
    pub exact_match_weight: f64,
    /// Weight of relationship-pattern agreement.
    pub relation_weight: f64,
    /// A claim is grounded iff its score reaches this.
    pub grounding_threshold: f64,
    /// Below this, the best-evidence string is not worth reporting.
    pub best_evidence_floor: f64,
    /// Claims scoring below this get hedged or removed by the refiner.
    pub hedge_threshold: f64,
    /// Prepend a qualifier to low-confidence claims.
    pub hedge_low_confidence: bool,
    /// Remove unverified claim spans outright instead of hedging.
    pub remove_unverified: bool,
    /// Cap on generated verification questions.
    pub max_verification_questions: usize,
    /// Cap on claims extracted from one answer.
    pub max_claims: usize,
    /// Cap on citations parsed from one answer.
    pub max_citations: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            exact_match_weight: 0.7,
            relation_weight: 0.3,
            grounding_threshold: 0.6,
            best_evidence_floor: 0.1,
            hedge_threshold: 0.6,
            hedge_low_confidence: true,
            remove_unverified: false,
            max_verification_questions: 10,
            max_claims: 50,
            max_citations: 100,
        }
    }
}

/// Top-level configuration, deserializable from librarian.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarianConfig {
    pub retrieval: IterativeConfig,
    pub active: ActiveConfig,
    pub verification: VerificationConfig,
}

impl LibrarianConfig {
    /// Parse from TOML text. Unknown fields are ignored, missing fields
    /// fall back to defaults.
    pub fn from_toml_str(text: &str) -> LibrarianResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> LibrarianResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(_) => {
                debug!(path = %path.display(), "no config file — using defaults");
                Ok(Self::default())
            }
        }
    }
}
