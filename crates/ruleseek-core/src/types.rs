//! Domain types shared by the lexical and vector backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two indexed documents a chunk came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocSource {
    Primary,
    Secondary,
}

impl fmt::Display for DocSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocSource::Primary => write!(f, "primary"),
            DocSource::Secondary => write!(f, "secondary"),
        }
    }
}

impl FromStr for DocSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(DocSource::Primary),
            "secondary" => Ok(DocSource::Secondary),
            other => Err(format!("unknown source tag: {other}")),
        }
    }
}

/// A bounded, trimmed substring of a source document.
///
/// `id` is derived from `source` and `seq_index` (`"{source}_{seq_index}"`)
/// so same-source proximity is computable from ids alone. `seq_index` is
/// contiguous ascending from 0 within a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub source: DocSource,
    pub text: String,
    pub seq_index: usize,
}

impl Chunk {
    pub fn new(source: DocSource, seq_index: usize, text: String) -> Self {
        Self { id: format!("{source}_{seq_index}"), source, text, seq_index }
    }
}

/// A chunk plus its L2-normalized embedding (vector backend only).
///
/// All stored vectors share one dimensionality, fixed by the embedder.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A chunk with its relevance score. Higher is always better: BM25 for the
/// lexical backend, cosine similarity for the vector backend.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
}

/// The final retrieval output: one joined context string per source.
/// Either string may be empty when that source contributed no chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContext {
    pub primary_context: String,
    pub secondary_context: String,
}
