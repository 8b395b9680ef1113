//! # librarian-core
//!
//! Shared data model for the librarian grounding-and-retrieval core.
//!
//! ## Modules
//! - `config` — LibrarianConfig and per-subsystem sections
//! - `errors` — LibrarianError / LibrarianResult
//! - `facts` — typed code facts and evidence-string rendering
//! - `identifiers` — pure identifier extraction from text
//! - `relations` — relationship-pattern recognition (extends/returns/…)
//! - `store` — the FactStore seam plus in-memory and directory-backed
//!   reference implementations and the per-invocation evidence cache

pub mod config;
pub mod errors;
pub mod facts;
pub mod identifiers;
pub mod relations;
pub mod store;

pub use config::{ActiveConfig, IterativeConfig, LibrarianConfig, VerificationConfig};
pub use errors::{LibrarianError, LibrarianResult};
pub use facts::{Fact, FactKind};
pub use relations::{Relation, RelationMatch, RelationScanner};
pub use store::{DirFactStore, EvidenceCache, FactStore, FileContent, MemoryFactStore, ResultItem};
