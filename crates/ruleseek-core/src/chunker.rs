//! Splits raw document text into overlapping, boundary-aware chunks.
//!
//! Pure and deterministic: the same text always yields the same chunk
//! sequence. Windows are cut at the nearest paragraph break inside the
//! lookback region, else the nearest sentence end, else the raw window
//! edge, so chunks rarely truncate mid-sentence.

use crate::config::ChunkingConfig;
use crate::types::{Chunk, DocSource};

/// Chunk `text` into overlapping windows tagged with `source`.
///
/// Whitespace-only input yields an empty sequence. Text shorter than the
/// window yields exactly one chunk. `seq_index` advances only for emitted
/// chunks, never for windows that trim to nothing.
pub fn chunk_text(text: &str, source: DocSource, cfg: &ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut seq = 0usize;
    let mut start = 0usize;

    while start < total {
        let hard_end = (start + cfg.chunk_size).min(total);
        let end = if hard_end < total {
            adjust_boundary(&chars, start, hard_end, cfg.boundary_lookback)
        } else {
            hard_end
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk::new(source, seq, trimmed.to_string()));
            seq += 1;
        }

        if end >= total {
            break;
        }
        // Overlap with the previous window, but always move forward by at
        // least one character so pathological inputs cannot loop.
        start = end.saturating_sub(cfg.chunk_overlap).max(start + 1);
    }

    chunks
}

/// Pull the proposed cut at `hard_end` back to the best break inside the
/// lookback region: paragraph break first, sentence end second, raw edge
/// if the region has neither.
fn adjust_boundary(chars: &[char], start: usize, hard_end: usize, lookback: usize) -> usize {
    let floor = hard_end.saturating_sub(lookback).max(start + 1);

    // Nearest "\n\n" ending before hard_end; cut just past it.
    let mut i = hard_end;
    while i >= floor + 2 {
        if chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
        i -= 1;
    }

    // Nearest sentence terminator followed by whitespace; keep the
    // terminator in the chunk.
    let mut i = hard_end;
    while i > floor {
        let c = chars[i - 1];
        if matches!(c, '.' | '!' | '?') && chars.get(i).is_some_and(|n| n.is_whitespace()) {
            return i;
        }
        i -= 1;
    }

    hard_end
}
