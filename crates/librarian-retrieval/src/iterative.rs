//! Multi-round retrieval with term discovery, cross-file chasing, and a
//! coverage-gain stopping rule.
//!
//! Each round queries the fact store, mines result snippets for new
//! identifiers, optionally follows imports into neighboring files, and
//! stops when the marginal coverage gain falls below the configured
//! minimum or the round budget runs out. Rounds are append-only and never
//! revised.

use librarian_core::config::IterativeConfig;
use librarian_core::identifiers::IdentifierScanner;
use librarian_core::store::{DirFactStore, FactStore, ResultItem};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::chasing::ImportChaser;
use crate::expansion::{compose_query, tokenize_query};

/// Cap on results carried per round.
const MAX_RESULTS_PER_ROUND: usize = 20;

/// One completed retrieval round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRound {
    /// 1-based, contiguous.
    pub round: usize,
    pub query: String,
    pub results: Vec<ResultItem>,
    /// Terms first discovered in this round.
    pub new_terms: Vec<String>,
    /// Fraction of known terms reflected in this round's results.
    pub coverage: f64,
}

/// Why the retrieval loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Round budget exhausted.
    MaxRounds,
    /// Marginal coverage gain fell below the configured minimum.
    CoverageGainBelowMin,
    /// No query terms left and expansion produced nothing new.
    QueryExhausted,
    /// The corpus had nothing to search (or the query was empty).
    EmptyCorpus,
}

/// The caller-facing retrieval report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeRetrievalResult {
    pub query: String,
    pub rounds: Vec<RetrievalRound>,
    /// Best current view: per-file dedup across all rounds, highest score
    /// wins, sorted by score.
    pub final_results: Vec<ResultItem>,
    /// The last round's coverage (0.0 with no rounds).
    pub total_coverage: f64,
    /// All terms discovered across rounds, first-seen order.
    pub terms_discovered: Vec<String>,
    /// All files matched or chased across rounds, first-seen order.
    pub files_explored: Vec<String>,
    pub stop_reason: StopReason,
}

impl IterativeRetrievalResult {
    fn empty(query: &str, stop_reason: StopReason) -> Self {
        Self {
            query: query.to_string(),
            rounds: Vec::new(),
            final_results: Vec::new(),
            total_coverage: 0.0,
            terms_discovered: Vec::new(),
            files_explored: Vec::new(),
            stop_reason,
        }
    }
}

/// Multi-round retriever over a fact store.
pub struct IterativeRetriever {
    config: IterativeConfig,
    scanner: IdentifierScanner,
    chaser: ImportChaser,
}

impl IterativeRetriever {
    pub fn new(config: IterativeConfig) -> Self {
        Self {
            config,
            scanner: IdentifierScanner::new(),
            chaser: ImportChaser::new(),
        }
    }

    /// Convenience entry point: open a directory-backed store at
    /// `corpus_root` and retrieve. A non-existent root yields an
    /// empty-but-valid result, never an error.
    pub fn retrieve_from_root(&self, query: &str, corpus_root: impl AsRef<Path>) -> IterativeRetrievalResult {
        let store = DirFactStore::open(corpus_root);
        if store.file_count() == 0 {
            return IterativeRetrievalResult::empty(query, StopReason::EmptyCorpus);
        }
        self.retrieve(query, &store)
    }

    /// Run the retrieval loop against `store`.
    pub fn retrieve(&self, query: &str, store: &dyn FactStore) -> IterativeRetrievalResult {
        let base_terms = tokenize_query(query);
        if base_terms.is_empty() {
            debug!(query, "no usable query terms — empty result");
            return IterativeRetrievalResult::empty(query, StopReason::QueryExhausted);
        }
        if self.config.max_rounds == 0 {
            // A valid degenerate input, not an error.
            return IterativeRetrievalResult::empty(query, StopReason::MaxRounds);
        }

        // Run-scoped accumulators; nothing crosses invocations.
        let mut known: FxHashSet<String> =
            base_terms.iter().map(|t| t.to_lowercase()).collect();
        let mut terms_discovered: Vec<String> = Vec::new();
        let mut files_explored: Vec<String> = Vec::new();
        let mut files_seen: FxHashSet<String> = FxHashSet::default();
        let mut chased_seen: FxHashSet<String> = FxHashSet::default();
        let mut rounds: Vec<RetrievalRound> = Vec::new();
        let mut current_terms = compose_query(&base_terms, &[], self.config.max_query_terms);
        let mut prev_coverage = 0.0;
        let mut stop_reason = StopReason::MaxRounds;

        for round_num in 1..=self.config.max_rounds {
            let query_text = current_terms.join(" ");
            let results = self.search_terms(store, &current_terms);

            for item in &results {
                if files_seen.insert(item.file.clone()) {
                    files_explored.push(item.file.clone());
                }
            }

            // Term discovery from result snippets.
            let mut new_terms: Vec<String> = Vec::new();
            if self.config.term_expansion {
                for item in &results {
                    for term in self.scanner.extract_new(&item.snippet, &known) {
                        if new_terms.len() >= self.config.max_expansion_terms {
                            break;
                        }
                        known.insert(term.to_lowercase());
                        terms_discovered.push(term.clone());
                        new_terms.push(term);
                    }
                }
            }

            // Cross-file chasing over the matched files' full content.
            if self.config.cross_file_chasing {
                for item in &results {
                    let Some(content) = store.read_file(&item.file) else {
                        continue;
                    };
                    for chased in
                        self.chaser
                            .chase(store, &item.file, &content.content, &mut chased_seen)
                    {
                        if files_seen.insert(chased.clone()) {
                            files_explored.push(chased);
                        }
                    }
                }
            }

            let coverage = round_coverage(&known, &results);
            let gain = coverage - prev_coverage;
            info!(
                round = round_num,
                query = %query_text,
                results = results.len(),
                coverage,
                gain,
                "retrieval round complete"
            );

            rounds.push(RetrievalRound {
                round: round_num,
                query: query_text,
                results,
                new_terms: new_terms.clone(),
                coverage,
            });
            prev_coverage = coverage;

            if gain < self.config.min_coverage_gain {
                stop_reason = StopReason::CoverageGainBelowMin;
                break;
            }

            let next_terms =
                compose_query(&base_terms, &terms_discovered, self.config.max_query_terms);
            if next_terms.is_empty() || (new_terms.is_empty() && next_terms == current_terms) {
                stop_reason = StopReason::QueryExhausted;
                break;
            }
            current_terms = next_terms;
        }

        let final_results = merge_rounds(&rounds);
        debug!(
            rounds = rounds.len(),
            files = files_explored.len(),
            terms = terms_discovered.len(),
            stop = ?stop_reason,
            "retrieval finished"
        );
        IterativeRetrievalResult {
            query: query.to_string(),
            total_coverage: rounds.last().map_or(0.0, |r| r.coverage),
            rounds,
            final_results,
            terms_discovered,
            files_explored,
            stop_reason,
        }
    }

    /// Search each term, merging matches per file: highest score wins,
    /// matched terms union, first snippet kept.
    fn search_terms(&self, store: &dyn FactStore, terms: &[String]) -> Vec<ResultItem> {
        let mut by_file: FxHashMap<String, ResultItem> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();
        for term in terms {
            for item in store.search(term) {
                match by_file.get_mut(&item.file) {
                    Some(existing) => {
                        if item.score > existing.score {
                            existing.score = item.score;
                        }
                        for t in &item.matched_terms {
                            if !existing.matched_terms.contains(t) {
                                existing.matched_terms.push(t.clone());
                            }
                        }
                    }
                    None => {
                        order.push(item.file.clone());
                        by_file.insert(item.file.clone(), item);
                    }
                }
            }
        }
        let mut merged: Vec<ResultItem> = order
            .into_iter()
            .filter_map(|f| by_file.remove(&f))
            .collect();
        merged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
        merged.truncate(MAX_RESULTS_PER_ROUND);
        merged
    }
}

impl Default for IterativeRetriever {
    fn default() -> Self {
        Self::new(IterativeConfig::default())
    }
}

/// Coverage: the fraction of known terms reflected in this round's results
/// (matched terms or snippet text). Monotone in expectation only — term
/// expansion can add unmatched terms faster than matching absorbs them, so
/// coverage can legitimately drop between rounds.
fn round_coverage(known: &FxHashSet<String>, results: &[ResultItem]) -> f64 {
    if known.is_empty() {
        return 0.0;
    }
    let mut haystack = String::new();
    for item in results {
        for t in &item.matched_terms {
            haystack.push_str(&t.to_lowercase());
            haystack.push(' ');
        }
        haystack.push_str(&item.snippet.to_lowercase());
        haystack.push(' ');
    }
    let matched = known.iter().filter(|t| haystack.contains(t.as_str())).count();
    matched as f64 / known.len() as f64
}

/// Per-file dedup across rounds, keeping the highest-scored item.
fn merge_rounds(rounds: &[RetrievalRound]) -> Vec<ResultItem> {
    let mut by_file: FxHashMap<String, ResultItem> = FxHashMap::default();
    let mut order: Vec<String> = Vec::new();
    for round in rounds {
        for item in &round.results {
            match by_file.get_mut(&item.file) {
                Some(existing) => {
                    if item.score > existing.score {
                        *existing = item.clone();
                    }
                }
                None => {
                    order.push(item.file.clone());
                    by_file.insert(item.file.clone(), item.clone());
                }
            }
        }
    }
    let mut merged: Vec<ResultItem> = order
        .into_iter()
        .filter_map(|f| by_file.remove(&f))
        .collect();
    merged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    merged
}
