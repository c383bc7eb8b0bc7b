//! Final-stage selection: threshold, per-source cap, and dedup over a
//! descending-scored candidate list. Applied identically for both scoring
//! backends so the policy behaves the same regardless of who ranked.

use crate::config::SelectionConfig;
use crate::types::{DocSource, ScoredCandidate};
use std::collections::HashMap;

/// How two chunks are judged redundant.
///
/// `SeqWindow` rejects same-source chunks whose sequence indices sit within
/// a small window of each other, which is exactly what the chunker's
/// overlapping windows produce. `Shingle` compares normalized text and
/// catches repeated passages anywhere in the document; it is the default.
#[derive(Debug, Clone)]
pub enum DedupPolicy {
    SeqWindow { window: usize },
    Shingle { words: usize, step: usize },
}

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy::Shingle { words: 5, step: 2 }
    }
}

struct Accepted {
    source: DocSource,
    seq_index: usize,
    normalized: String,
}

impl DedupPolicy {
    fn is_duplicate(&self, candidate: &ScoredCandidate, cand_norm: &str, accepted: &[Accepted]) -> bool {
        match self {
            DedupPolicy::SeqWindow { window } => accepted.iter().any(|a| {
                a.source == candidate.chunk.source
                    && a.seq_index.abs_diff(candidate.chunk.seq_index) <= *window
            }),
            DedupPolicy::Shingle { words, step } => {
                accepted.iter().any(|a| shares_shingle(cand_norm, &a.normalized, *words, *step))
            }
        }
    }
}

/// Select the final chunk set from a descending-scored candidate list.
///
/// Stops at `top_k` accepted chunks or at the first score below
/// `min_score` (valid because the input is sorted). An empty return is a
/// normal "nothing relevant enough" outcome.
pub fn select(
    candidates: &[ScoredCandidate],
    cfg: &SelectionConfig,
    dedup: &DedupPolicy,
) -> Vec<ScoredCandidate> {
    let mut picked: Vec<ScoredCandidate> = Vec::new();
    let mut accepted: Vec<Accepted> = Vec::new();
    let mut per_source: HashMap<DocSource, usize> = HashMap::new();

    for cand in candidates {
        if picked.len() >= cfg.top_k || cand.score < cfg.min_score {
            break;
        }
        let taken = per_source.get(&cand.chunk.source).copied().unwrap_or(0);
        if taken >= cfg.max_per_source {
            continue;
        }
        let cand_norm = normalize(&cand.chunk.text);
        if dedup.is_duplicate(cand, &cand_norm, &accepted) {
            continue;
        }
        accepted.push(Accepted {
            source: cand.chunk.source,
            seq_index: cand.chunk.seq_index,
            normalized: cand_norm,
        });
        *per_source.entry(cand.chunk.source).or_insert(0) += 1;
        picked.push(cand.clone());
    }

    picked
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when any `words`-long shingle of `cand` (sliding by `step`) occurs
/// verbatim inside `accepted`. Candidates shorter than one shingle are
/// compared whole.
fn shares_shingle(cand: &str, accepted: &str, words: usize, step: usize) -> bool {
    let tokens: Vec<&str> = cand.split(' ').collect();
    if cand.is_empty() {
        return false;
    }
    if tokens.len() < words {
        return accepted.contains(cand);
    }
    let step = step.max(1);
    let mut i = 0;
    while i + words <= tokens.len() {
        let shingle = tokens[i..i + words].join(" ");
        if accepted.contains(&shingle) {
            return true;
        }
        i += step;
    }
    false
}
