use anyhow::anyhow;
use ruleseek_core::config::ChunkingConfig;
use ruleseek_embed::{default_embedder, Embedder, HashingEmbedder};
use ruleseek_engine::{EngineConfig, RetrievalEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PARA_WOLVES: &str = "Wolves attack at night.";
const PARA_CAMP: &str = "At night the wolves attack the camp.";
const PARA_TRADE: &str = "Trading requires a settlement token and one food.";

fn rulebook() -> String {
    format!("{PARA_WOLVES}\n\n{PARA_CAMP}\n\n{PARA_TRADE}")
}

fn test_config() -> EngineConfig {
    let mut cfg = EngineConfig::vector_default();
    cfg.chunking = ChunkingConfig { chunk_size: 40, chunk_overlap: 2, boundary_lookback: 20 };
    // The hashing embedder's cosine scores run lower than a trained
    // model's; keep the floor above noise but below real overlap.
    cfg.selection.min_score = 0.2;
    cfg
}

#[tokio::test]
async fn retrieve_uses_the_in_memory_cache_after_ingest() {
    let tmp = TempDir::new().expect("tmp");
    let mut engine = RetrievalEngine::open_vector(tmp.path(), default_embedder(), test_config())
        .await
        .expect("open");
    engine.ingest(&rulebook(), "").await;
    assert!(engine.is_ready());
    assert!(engine.index_error().is_none());

    let ctx = engine.retrieve("wolves attack at night").await.expect("context");
    assert!(ctx.primary_context.contains("Wolves attack at night"));
    assert!(ctx.primary_context.contains("camp"));
    assert!(ctx.secondary_context.is_empty());
}

#[tokio::test]
async fn relaunch_serves_from_storage_without_reembedding() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut engine =
            RetrievalEngine::open_vector(tmp.path(), default_embedder(), test_config())
                .await
                .expect("open");
        engine.ingest(&rulebook(), "").await;
    }
    // Second launch, unchanged content: the hash matches, the cache is
    // cold, and scoring goes through the store's nearest-neighbor path.
    let mut engine = RetrievalEngine::open_vector(tmp.path(), default_embedder(), test_config())
        .await
        .expect("reopen");
    engine.ingest(&rulebook(), "").await;

    let ctx = engine.retrieve("wolves attack at night").await.expect("context");
    assert!(ctx.primary_context.contains("wolves"));
}

#[tokio::test]
async fn single_surviving_chunk_is_not_enough() {
    let tmp = TempDir::new().expect("tmp");
    let mut engine = RetrievalEngine::open_vector(tmp.path(), default_embedder(), test_config())
        .await
        .expect("open");
    // Only one chunk exists, so at most one can be accepted, which is
    // below the minimum viable count for the vector backend.
    engine.ingest(PARA_WOLVES, "").await;

    assert!(engine.retrieve("wolves attack at night").await.is_none());
}

#[tokio::test]
async fn unusable_query_representations_fall_back() {
    let tmp = TempDir::new().expect("tmp");
    let mut engine = RetrievalEngine::open_vector(tmp.path(), default_embedder(), test_config())
        .await
        .expect("open");
    engine.ingest(&rulebook(), "").await;

    assert!(engine.retrieve("").await.is_none());
    assert!(engine.retrieve("   ").await.is_none());
    // Strips to nothing, embeds to a zero vector.
    assert!(engine.retrieve("?!? ... !!").await.is_none());
}

#[tokio::test]
async fn wrong_dimension_embedder_is_absorbed() {
    let tmp = TempDir::new().expect("tmp");
    // Vectors come back the wrong length; the write must fail with an
    // error, not a panic, and the engine must stay usable.
    let mut engine = RetrievalEngine::open_vector(
        tmp.path(),
        Box::new(HashingEmbedder::with_dim(5)),
        test_config(),
    )
    .await
    .expect("open");
    engine.ingest(&rulebook(), "").await;

    assert!(engine.is_ready());
    assert!(engine.index_error().is_some());
    assert!(engine.retrieve("wolves attack at night").await.is_none());
}

/// Embeds at the full dimension until `broken` is flipped, then at a
/// wrong one, so a later ingest can be made to fail after a good one.
struct SwitchableEmbedder {
    broken: Arc<AtomicBool>,
}

impl Embedder for SwitchableEmbedder {
    fn dim(&self) -> usize {
        ruleseek_core::config::EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let dim = if self.broken.load(Ordering::SeqCst) { 5 } else { self.dim() };
        HashingEmbedder::with_dim(dim).embed(text)
    }
}

#[tokio::test]
async fn failed_reingest_does_not_serve_the_stale_snapshot() {
    let tmp = TempDir::new().expect("tmp");
    let broken = Arc::new(AtomicBool::new(false));
    let embedder = Box::new(SwitchableEmbedder { broken: Arc::clone(&broken) });
    let mut engine = RetrievalEngine::open_vector(tmp.path(), embedder, test_config())
        .await
        .expect("open");
    engine.ingest(&rulebook(), "").await;
    assert!(engine.retrieve("wolves attack at night").await.is_some());

    broken.store(true, Ordering::SeqCst);
    engine.ingest("A completely different ruleset about dice towers.", "").await;
    assert!(engine.index_error().is_some());

    // The replace failed partway, so nothing is persisted anymore; the
    // pre-failure chunks must not keep answering from memory.
    assert!(engine.retrieve("wolves attack at night").await.is_none());
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize {
        ruleseek_core::config::EMBEDDING_DIM
    }

    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("model unavailable"))
    }
}

#[tokio::test]
async fn embedder_failure_never_reaches_the_caller() {
    let tmp = TempDir::new().expect("tmp");
    let mut engine =
        RetrievalEngine::open_vector(tmp.path(), Box::new(FailingEmbedder), test_config())
            .await
            .expect("open");
    engine.ingest(&rulebook(), "").await;

    // Ingest failed but the engine is still usable in fallback mode.
    assert!(engine.is_ready());
    assert!(engine.index_error().is_some());
    assert!(engine.retrieve("wolves attack at night").await.is_none());

    let traces = engine.recent_traces();
    assert_eq!(traces.len(), 1);
    assert!(traces[0].fell_back);
}
