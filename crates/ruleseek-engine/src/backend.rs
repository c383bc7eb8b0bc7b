//! Scoring backends behind one contract, so the orchestrator and selector
//! never care whether ranking came from BM25 or cosine similarity.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use ruleseek_core::error::RetrievalError;
use ruleseek_core::types::{Chunk, EmbeddedChunk, ScoredCandidate};
use ruleseek_embed::Embedder;
use ruleseek_text::LexicalIndex;
use ruleseek_vector::VectorStore;

use crate::keywords::extract_keywords;

/// Outcome of scoring one query. `NoQuery` and an empty candidate list are
/// ordinary control flow; `Failed` is an absorbed error (embedding or
/// storage), reported upward only as a fallback signal.
pub enum ScoreOutcome {
    NoQuery,
    Failed(String),
    Candidates { repr: String, list: Vec<ScoredCandidate> },
}

#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn is_index_current(&self, hash: &str) -> bool;
    async fn chunk_count(&self) -> usize;
    /// Atomically replace the stored chunk set and stamp `hash`.
    async fn save_index(&mut self, chunks: Vec<Chunk>, hash: &str) -> Result<()>;
    /// Rank stored chunks against the query, sorted descending.
    async fn score(&self, query: &str) -> ScoreOutcome;
    /// Fewest accepted chunks the backend trusts as usable context.
    fn min_accepted(&self) -> usize {
        1
    }
}

/// BM25 term-overlap ranking over the tantivy store.
pub struct LexicalBackend {
    store: LexicalIndex,
    candidate_limit: usize,
}

impl LexicalBackend {
    pub fn open(dir: &Path, candidate_limit: usize) -> Result<Self> {
        Ok(Self { store: LexicalIndex::open(dir)?, candidate_limit })
    }
}

impl Backend for LexicalBackend {
    async fn is_index_current(&self, hash: &str) -> bool {
        self.store.is_index_current(hash)
    }

    async fn chunk_count(&self) -> usize {
        self.store.chunk_count()
    }

    async fn save_index(&mut self, chunks: Vec<Chunk>, hash: &str) -> Result<()> {
        self.store
            .save_index(&chunks, hash)
            .map_err(|e| RetrievalError::Storage(e.to_string()).into())
    }

    async fn score(&self, query: &str) -> ScoreOutcome {
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            debug!(%query, "no keywords survived filtering");
            return ScoreOutcome::NoQuery;
        }
        let repr = keywords.join(" ");
        let list = self.store.query(&keywords, self.candidate_limit);
        ScoreOutcome::Candidates { repr, list }
    }
}

/// Cosine-similarity ranking via the embedder collaborator.
///
/// After an ingest the freshly embedded chunks are kept as an `Arc`
/// snapshot and scored in memory; on a relaunch with a current index the
/// cache is empty and nearest-neighbor search is delegated to the store.
pub struct VectorBackend {
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    cache: Option<Arc<Vec<EmbeddedChunk>>>,
    candidate_limit: usize,
    min_results: usize,
}

impl VectorBackend {
    pub async fn open(
        dir: &Path,
        embedder: Box<dyn Embedder>,
        candidate_limit: usize,
        min_results: usize,
    ) -> Result<Self> {
        let store = VectorStore::open(dir).await?;
        Ok(Self { store, embedder, cache: None, candidate_limit, min_results })
    }

    fn embed_query(&self, query: &str) -> Result<Option<Vec<f32>>> {
        let vector = self.embedder.embed(query)?;
        if vector.iter().all(|x| *x == 0.0) {
            return Ok(None);
        }
        Ok(Some(vector))
    }
}

impl Backend for VectorBackend {
    async fn is_index_current(&self, hash: &str) -> bool {
        self.store.is_index_current(hash).await
    }

    async fn chunk_count(&self) -> usize {
        self.store.chunk_count().await
    }

    async fn save_index(&mut self, chunks: Vec<Chunk>, hash: &str) -> Result<()> {
        // Drop the old snapshot up front: if the replace fails partway the
        // next score must read whatever the store actually holds, not a
        // pre-failure copy.
        self.cache = None;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();
        self.store
            .save_index(&embedded, hash)
            .await
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        self.cache = Some(Arc::new(embedded));
        Ok(())
    }

    async fn score(&self, query: &str) -> ScoreOutcome {
        let query_vec = match self.embed_query(query) {
            Ok(Some(v)) => v,
            Ok(None) => return ScoreOutcome::NoQuery,
            Err(e) => return ScoreOutcome::Failed(format!("query embedding failed: {e}")),
        };
        let repr = format!("embedding(dim={})", query_vec.len());

        if let Some(cache) = self.cache.as_ref().filter(|c| !c.is_empty()) {
            // Fast path: dot products against the snapshot. Vectors are
            // normalized, so this is cosine similarity.
            let snapshot = Arc::clone(cache);
            let mut list: Vec<ScoredCandidate> = snapshot
                .iter()
                .map(|e| ScoredCandidate {
                    chunk: e.chunk.clone(),
                    score: dot(&query_vec, &e.vector),
                })
                .collect();
            list.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            list.truncate(self.candidate_limit);
            return ScoreOutcome::Candidates { repr, list };
        }

        let list = self.store.query_top_k(&query_vec, self.candidate_limit).await;
        ScoreOutcome::Candidates { repr, list }
    }

    fn min_accepted(&self) -> usize {
        self.min_results
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
