//! Compiled-in engine tunables.
//!
//! The engine is configured entirely through these structs; there is no
//! file- or environment-based configuration surface.

/// Dimensionality of the embedding vectors stored by the vector backend.
pub const EMBEDDING_DIM: usize = 100;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// How far the next window starts before the previous window's end.
    pub chunk_overlap: usize,
    /// How far back from a proposed cut to look for a paragraph or
    /// sentence boundary.
    pub boundary_lookback: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 100, boundary_lookback: 100 }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Maximum number of accepted chunks.
    pub top_k: usize,
    /// Candidates scoring below this are rejected, and since input is
    /// sorted descending the selector stops at the first one.
    pub min_score: f32,
    /// Cap on accepted chunks per source, so neither document can crowd
    /// the other out of the result set.
    pub max_per_source: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { top_k: 6, min_score: 0.0, max_per_source: 3 }
    }
}
