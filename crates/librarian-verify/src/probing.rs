//! Batch probing of an answer source.
//!
//! A probe is a question put to an [`AnswerProvider`]; each answer runs
//! through the refinement stack and the runner aggregates hallucination
//! rates before and after refinement. A provider failure marks that probe
//! failed and the run continues.

use std::path::{Path, PathBuf};

use librarian_core::config::VerificationConfig;
use librarian_core::errors::LibrarianResult;
use librarian_core::facts::Fact;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cove::{CoveRefiner, VerifiedResponse};

/// Something that can answer a question about the codebase.
pub trait AnswerProvider {
    fn answer(&self, question: &str) -> LibrarianResult<String>;
}

impl<F> AnswerProvider for F
where
    F: Fn(&str) -> LibrarianResult<String>,
{
    fn answer(&self, question: &str) -> LibrarianResult<String> {
        self(question)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub question: String,
    /// `None` when the provider failed for this probe.
    pub response: Option<VerifiedResponse>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRunReport {
    pub outcomes: Vec<ProbeOutcome>,
    pub answered: usize,
    pub failed: usize,
    /// Mean non-entailed rate across answered probes, before refinement.
    pub before_rate: f64,
    /// Same, measured on the refined answers.
    pub after_rate: f64,
}

/// Runs probe questions through a provider and verifies every answer.
pub struct ProbeRunner {
    refiner: CoveRefiner,
    repo_root: PathBuf,
}

impl ProbeRunner {
    pub fn new(config: VerificationConfig, repo_root: impl AsRef<Path>) -> Self {
        Self {
            refiner: CoveRefiner::new(config),
            repo_root: repo_root.as_ref().to_path_buf(),
        }
    }

    pub fn run(
        &self,
        probes: &[String],
        provider: &dyn AnswerProvider,
        facts: &[Fact],
    ) -> ProbeRunReport {
        let mut outcomes = Vec::with_capacity(probes.len());
        let mut before_sum = 0.0;
        let mut after_sum = 0.0;
        let mut answered = 0usize;
        for question in probes {
            match provider.answer(question) {
                Ok(answer) => {
                    let response = self.refiner.verify(&answer, &self.repo_root, facts);
                    before_sum += response.before_rate;
                    after_sum += response.after_rate;
                    answered += 1;
                    outcomes.push(ProbeOutcome {
                        question: question.clone(),
                        response: Some(response),
                        failure: None,
                    });
                }
                Err(err) => {
                    warn!(probe = %question, error = %err, "provider failed");
                    outcomes.push(ProbeOutcome {
                        question: question.clone(),
                        response: None,
                        failure: Some(err.to_string()),
                    });
                }
            }
        }
        let failed = outcomes.len() - answered;
        let report = ProbeRunReport {
            before_rate: if answered == 0 { 0.0 } else { before_sum / answered as f64 },
            after_rate: if answered == 0 { 0.0 } else { after_sum / answered as f64 },
            outcomes,
            answered,
            failed,
        };
        info!(
            answered,
            failed,
            before_rate = report.before_rate,
            after_rate = report.after_rate,
            "probe run complete"
        );
        report
    }
}
