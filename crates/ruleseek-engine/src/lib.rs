//! ruleseek-engine
//!
//! Ties the chunker, index stores, scorers and selector into the two
//! public flows: `ingest` (build or reuse the index) and `retrieve`
//! (question in, per-source context strings or `None` out). `None` always
//! means "fall back to the full document"; no failure below this crate
//! reaches the caller as an error.

pub mod backend;
pub mod engine;
pub mod keywords;
pub mod trace;

pub use backend::{Backend, LexicalBackend, ScoreOutcome, VectorBackend};
pub use engine::{EngineConfig, RetrievalEngine};
pub use trace::RetrievalTrace;
