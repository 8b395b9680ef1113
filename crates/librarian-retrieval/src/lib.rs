//! # librarian-retrieval
//!
//! Retrieval quality for the librarian core: did we retrieve enough?
//!
//! ## Modules
//! - `iterative` — multi-round retrieval with term discovery, cross-file
//!   chasing, and a coverage-gain stopping rule
//! - `active` — confidence-triggered (FLARE-style) retrieval decisions
//! - `expansion` — query tokenization and expansion caps
//! - `chasing` — import/export specifier resolution across files

pub mod active;
pub mod chasing;
pub mod expansion;
pub mod iterative;

pub use active::{ActiveRetriever, ConfidenceSignal, RetrievalPoint};
pub use iterative::{IterativeRetrievalResult, IterativeRetriever, RetrievalRound, StopReason};
