//! The orchestrator: ingest and retrieve flows over a scoring backend.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use ruleseek_core::chunker::chunk_text;
use ruleseek_core::config::{ChunkingConfig, SelectionConfig};
use ruleseek_core::hash::content_hash;
use ruleseek_core::selector::{select, DedupPolicy};
use ruleseek_core::types::{DocSource, RetrievedContext, ScoredCandidate};
use ruleseek_embed::Embedder;

use crate::backend::{Backend, LexicalBackend, ScoreOutcome, VectorBackend};
use crate::trace::{RetrievalTrace, TraceBuffer};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chunking: ChunkingConfig,
    pub selection: SelectionConfig,
    pub dedup: DedupPolicy,
    /// Fewest selector-accepted chunks the vector backend trusts; a single
    /// isolated chunk is too weak a context. Tuned empirically.
    pub min_vector_results: usize,
    pub trace_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            selection: SelectionConfig::default(),
            dedup: DedupPolicy::default(),
            min_vector_results: 2,
            trace_capacity: 16,
        }
    }
}

impl EngineConfig {
    /// Defaults for the vector backend: cosine scores below this carry no
    /// signal for this content domain.
    pub fn vector_default() -> Self {
        let mut cfg = Self::default();
        cfg.selection.min_score = 0.35;
        cfg
    }

    fn candidate_limit(&self) -> usize {
        // Over-fetch so the selector has room to drop duplicates and
        // capped sources without starving.
        self.selection.top_k * 10
    }
}

/// Retrieval orchestrator.
///
/// `ingest` builds (or reuses) the persistent index; `retrieve` turns a
/// question into per-source context strings. Every internal failure is
/// absorbed into `None` / `index_error`; the caller's fallback of sending
/// the full document always remains correct.
pub struct RetrievalEngine<B: Backend> {
    backend: B,
    cfg: EngineConfig,
    ready: bool,
    index_error: Option<String>,
    traces: TraceBuffer,
}

impl RetrievalEngine<LexicalBackend> {
    pub fn open_lexical(dir: &Path, cfg: EngineConfig) -> Result<Self> {
        let backend = LexicalBackend::open(dir, cfg.candidate_limit())?;
        Ok(Self::with_backend(backend, cfg))
    }
}

impl RetrievalEngine<VectorBackend> {
    pub async fn open_vector(
        dir: &Path,
        embedder: Box<dyn Embedder>,
        cfg: EngineConfig,
    ) -> Result<Self> {
        let backend =
            VectorBackend::open(dir, embedder, cfg.candidate_limit(), cfg.min_vector_results)
                .await?;
        Ok(Self::with_backend(backend, cfg))
    }
}

impl<B: Backend> RetrievalEngine<B> {
    pub fn with_backend(backend: B, cfg: EngineConfig) -> Self {
        let traces = TraceBuffer::new(cfg.trace_capacity);
        Self { backend, cfg, ready: false, index_error: None, traces }
    }

    /// Build the index from the two source documents, or reuse the stored
    /// one when the content hash still matches. Never fails the caller: a
    /// broken ingest records `index_error` and the engine stays usable in
    /// fallback mode.
    pub async fn ingest(&mut self, primary: &str, secondary: &str) {
        let hash = content_hash(primary, secondary);
        if self.backend.is_index_current(&hash).await && self.backend.chunk_count().await > 0 {
            info!(%hash, "index is current, skipping rebuild");
            self.ready = true;
            return;
        }

        let mut chunks = chunk_text(primary, DocSource::Primary, &self.cfg.chunking);
        chunks.extend(chunk_text(secondary, DocSource::Secondary, &self.cfg.chunking));
        info!(chunks = chunks.len(), %hash, "rebuilding index");

        match self.backend.save_index(chunks, &hash).await {
            Ok(()) => {
                self.index_error = None;
            }
            Err(e) => {
                warn!(error = %e, "ingest failed, continuing in fallback mode");
                self.index_error = Some(e.to_string());
            }
        }
        self.ready = true;
    }

    /// Answer a question with per-source context strings, or `None` when
    /// retrieval is inconclusive and the caller should supply the full
    /// document instead.
    pub async fn retrieve(&mut self, query: &str) -> Option<RetrievedContext> {
        if query.trim().is_empty() {
            return None;
        }

        let (repr, candidates) = match self.backend.score(query).await {
            ScoreOutcome::NoQuery => {
                debug!(%query, "query has no usable representation");
                self.trace(query, "", 0, 0, true);
                return None;
            }
            ScoreOutcome::Failed(e) => {
                warn!(%query, error = %e, "scoring failed, falling back");
                self.trace(query, "", 0, 0, true);
                return None;
            }
            ScoreOutcome::Candidates { repr, list } => (repr, list),
        };

        let picked = select(&candidates, &self.cfg.selection, &self.cfg.dedup);
        if picked.len() < self.backend.min_accepted().max(1) {
            debug!(
                %query,
                candidates = candidates.len(),
                accepted = picked.len(),
                "nothing passed selection, falling back"
            );
            self.trace(query, &repr, candidates.len(), picked.len(), true);
            return None;
        }

        self.trace(query, &repr, candidates.len(), picked.len(), false);
        Some(build_context(&picked))
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Error recorded by the last failed ingest, if any.
    pub fn index_error(&self) -> Option<&str> {
        self.index_error.as_deref()
    }

    /// The last few retrievals, oldest first.
    pub fn recent_traces(&self) -> Vec<RetrievalTrace> {
        self.traces.recent()
    }

    fn trace(&mut self, query: &str, repr: &str, considered: usize, accepted: usize, fell_back: bool) {
        self.traces.push(RetrievalTrace {
            query: query.to_string(),
            query_repr: repr.to_string(),
            candidates_considered: considered,
            accepted,
            fell_back,
        });
    }
}

/// Partition accepted chunks by source (keeping score order) and join each
/// partition with blank lines.
fn build_context(picked: &[ScoredCandidate]) -> RetrievedContext {
    let join = |source: DocSource| {
        picked
            .iter()
            .filter(|c| c.chunk.source == source)
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    RetrievedContext {
        primary_context: join(DocSource::Primary),
        secondary_context: join(DocSource::Secondary),
    }
}
