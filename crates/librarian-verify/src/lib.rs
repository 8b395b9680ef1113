//! # librarian-verify
//!
//! Grounding quality for the librarian core: is the answer true?
//!
//! ## Modules
//! - `claims` — sentence-level claim extraction with typed relations
//! - `citations` — `file:line` citation checks against the real tree
//! - `minicheck` — claim-vs-evidence grounding scores
//! - `entailment` — three-way entailment of claims against typed facts
//! - `cove` — chain-of-verification refinement (hedge or remove)
//! - `probing` — batch probe runs with before/after hallucination rates

pub mod citations;
pub mod claims;
pub mod cove;
pub mod entailment;
pub mod minicheck;
pub mod probing;

pub use citations::{CitationFailure, CitationVerificationReport, CitationVerifier};
pub use claims::{Claim, ClaimExtractor, ClaimKind};
pub use cove::{CoveRefiner, Modification, VerifiedResponse};
pub use entailment::{EntailmentChecker, EntailmentLabel, EntailmentReport};
pub use minicheck::{MiniCheckScore, MiniCheckScorer};
pub use probing::{AnswerProvider, ProbeRunReport, ProbeRunner};
