//! Confidence-triggered (FLARE-style) retrieval.
//!
//! Consumes a stream of (token, confidence) pairs from an external answer
//! generator and decides, per position, whether a retrieval should fire and
//! what query to issue. The core never generates tokens itself.

use librarian_core::config::ActiveConfig;
use librarian_core::identifiers::IdentifierScanner;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tokens of context kept when generating a query.
const CONTEXT_TOKENS: usize = 20;
/// Tokens of low-confidence span kept when generating a query.
const SPAN_TOKENS: usize = 8;

/// Per-token confidence signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceSignal {
    /// 0-based token position.
    pub position: usize,
    pub token: String,
    pub confidence: f64,
    /// True iff confidence is strictly below the threshold (NaN always
    /// counts as below).
    pub needs_retrieval: bool,
    /// Filled in by planning, not by analysis.
    pub last_retrieval_position: Option<usize>,
}

/// A position where a retrieval would fire, with its generated query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalPoint {
    pub position: usize,
    pub query: String,
}

/// The confidence-triggered retriever.
pub struct ActiveRetriever {
    config: ActiveConfig,
    scanner: IdentifierScanner,
}

impl ActiveRetriever {
    pub fn new(config: ActiveConfig) -> Self {
        Self {
            config,
            scanner: IdentifierScanner::new(),
        }
    }

    /// Pair tokens with confidences, tolerating length mismatch
    /// (`min(len, len)` pairs).
    pub fn analyze_confidence(&self, tokens: &[&str], confidences: &[f64]) -> Vec<ConfidenceSignal> {
        let threshold = self.config.confidence_threshold;
        tokens
            .iter()
            .zip(confidences.iter())
            .enumerate()
            .map(|(position, (token, &confidence))| ConfidenceSignal {
                position,
                token: token.to_string(),
                confidence,
                // Strict inequality; values exactly at threshold do not
                // trigger. NaN fails every comparison, so it always does.
                needs_retrieval: confidence.is_nan() || confidence < threshold,
                last_retrieval_position: None,
            })
            .collect()
    }

    /// Should a retrieval fire at `position`? True iff some position in the
    /// lookahead window needs retrieval and the gap since the last
    /// retrieval is at least `min_retrieval_gap`. Out-of-bounds positions
    /// are false, never a panic.
    pub fn should_retrieve(
        &self,
        signals: &[ConfidenceSignal],
        position: usize,
        last_retrieval_position: Option<usize>,
    ) -> bool {
        if position >= signals.len() {
            return false;
        }
        if let Some(last) = last_retrieval_position {
            // Eligible again exactly at gap == min_retrieval_gap.
            if position.saturating_sub(last) < self.config.min_retrieval_gap {
                return false;
            }
        }
        let end = position
            .saturating_add(self.config.window_size)
            .min(signals.len().saturating_sub(1));
        signals[position..=end].iter().any(|s| s.needs_retrieval)
    }

    /// Compose a short query from identifiers in the generation context and
    /// the low-confidence span. Either input may be empty; both empty
    /// yields an empty query.
    pub fn generate_query(&self, context: &str, low_confidence_span: &str) -> String {
        let mut terms: Vec<String> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for source in [low_confidence_span, context] {
            for term in self.scanner.extract(source) {
                if seen.insert(term.to_lowercase()) {
                    terms.push(term);
                }
            }
        }
        let raw = if terms.is_empty() {
            // No identifiers anywhere — fall back to the literal text.
            let fallback = if low_confidence_span.trim().is_empty() {
                context
            } else {
                low_confidence_span
            };
            fallback.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            terms.join(" ")
        };
        truncate_at_boundary(&raw, self.config.max_query_length)
    }

    /// Splice `retrieved` into `original` at byte `position` (clamped to a
    /// valid boundary within `[0, original.len()]`), preserving both sides
    /// and normalizing the seams to single spaces. Empty `retrieved` is a
    /// no-op.
    pub fn integrate_retrieval(&self, original: &str, retrieved: &str, position: usize) -> String {
        if retrieved.is_empty() {
            return original.to_string();
        }
        let mut pos = position.min(original.len());
        while pos > 0 && !original.is_char_boundary(pos) {
            pos -= 1;
        }
        let (left, right) = original.split_at(pos);
        let mut out = String::with_capacity(original.len() + retrieved.len() + 2);
        out.push_str(left.trim_end());
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(retrieved.trim());
        let right = right.trim_start();
        if !right.is_empty() {
            out.push(' ');
            out.push_str(right);
        }
        out
    }

    /// One pass over a full (token, confidence) stream: every position where
    /// a retrieval would fire, with its query, honoring the gap rule.
    pub fn plan_retrievals(&self, tokens: &[&str], confidences: &[f64]) -> Vec<RetrievalPoint> {
        let signals = self.analyze_confidence(tokens, confidences);
        let mut points = Vec::new();
        let mut last: Option<usize> = None;
        for position in 0..signals.len() {
            if !self.should_retrieve(&signals, position, last) {
                continue;
            }
            if !signals[position].needs_retrieval {
                // Window lookahead saw trouble ahead; fire at the trouble
                // spot, not here.
                continue;
            }
            let context_start = position.saturating_sub(CONTEXT_TOKENS);
            let context = tokens[context_start..position].join(" ");
            let span_end = (position + SPAN_TOKENS).min(signals.len());
            let span = tokens[position..span_end].join(" ");
            let query = self.generate_query(&context, &span);
            debug!(position, query = %query, "retrieval point planned");
            points.push(RetrievalPoint { position, query });
            last = Some(position);
        }
        points
    }
}

impl Default for ActiveRetriever {
    fn default() -> Self {
        Self::new(ActiveConfig::default())
    }
}

fn truncate_at_boundary(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_end().to_string()
}
