//! Embedding collaborator surface.
//!
//! The real embedding model lives outside this workspace; the engine only
//! sees the `Embedder` trait. `HashingEmbedder` is the in-tree default: a
//! deterministic bag-of-hashed-tokens embedding, good enough for offline
//! operation and for exercising the vector backend in tests.

use anyhow::Result;
use ruleseek_core::config::EMBEDDING_DIM;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    /// Embed one text into an L2-normalized vector of `dim()` floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Deterministic token-hashing embedder.
///
/// Each whitespace token is hashed into a bucket and contributes a
/// hash-derived weight, then the vector is L2-normalized. No model files,
/// no I/O, identical output across runs.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self { dim: EMBEDDING_DIM }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split_whitespace() {
            let token: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let weight = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

pub fn default_embedder() -> Box<dyn Embedder> {
    Box::new(HashingEmbedder::new())
}
