//! ruleseek-text
//!
//! Tantivy-backed lexical index store: BM25-ranked full-text search with a
//! lowercase + English-stemmer analyzer, plus sidecar metadata for
//! content-hash invalidation and schema versioning.

pub mod index;
pub mod tantivy_utils;

pub use index::LexicalIndex;
