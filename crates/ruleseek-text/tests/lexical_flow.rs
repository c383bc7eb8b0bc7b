use ruleseek_core::types::{Chunk, DocSource};
use ruleseek_text::LexicalIndex;
use tempfile::TempDir;

fn chunk(source: DocSource, seq: usize, text: &str) -> Chunk {
    Chunk::new(source, seq, text.to_string())
}

fn sample_chunks() -> Vec<Chunk> {
    vec![
        chunk(DocSource::Primary, 0, "Players draw two cards at dawn and discard one."),
        chunk(DocSource::Primary, 1, "Wolves attack only during the night phase. Fire wards them off."),
        chunk(DocSource::Primary, 2, "Trading requires a settlement token and one food."),
        chunk(DocSource::Secondary, 0, "The expansion adds a winter phase with frozen rivers."),
    ]
}

#[test]
fn save_then_query_ranks_matching_chunk_first() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    store.save_index(&sample_chunks(), "hash-a").expect("save");

    let hits = store.query(&["wolves".to_string(), "night".to_string()], 10);
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.seq_index, 1);
    assert_eq!(hits[0].chunk.source, DocSource::Primary);
    assert!(hits[0].chunk.text.contains("Wolves"));
    if hits.len() >= 2 {
        assert!(hits[0].score >= hits[1].score);
    }
}

#[test]
fn stemming_matches_morphological_variants() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    store.save_index(&sample_chunks(), "hash-a").expect("save");

    // Stored text says "Trading"; the query stem should still reach it.
    let hits = store.query(&["trade".to_string()], 10);
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.seq_index, 2);
}

#[test]
fn conjunction_rejects_partially_matching_queries() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    store.save_index(&sample_chunks(), "hash-a").expect("save");

    let hits = store.query(&["wolves".to_string(), "settlement".to_string()], 10);
    assert!(hits.is_empty(), "no chunk contains both terms");
}

#[test]
fn hash_staleness_tracks_last_save() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    assert!(!store.is_index_current("hash-a"));
    assert_eq!(store.chunk_count(), 0);

    store.save_index(&sample_chunks(), "hash-a").expect("save");
    assert!(store.is_index_current("hash-a"));
    assert!(!store.is_index_current("hash-b"));
    assert_eq!(store.chunk_count(), 4);

    store.save_index(&sample_chunks()[..2], "hash-b").expect("save");
    assert!(store.is_index_current("hash-b"));
    assert!(!store.is_index_current("hash-a"));
    assert_eq!(store.chunk_count(), 2);
}

#[test]
fn save_replaces_prior_chunks_wholesale() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    store.save_index(&sample_chunks(), "hash-a").expect("save");

    let replacement = vec![chunk(DocSource::Primary, 0, "Entirely new ruleset about dice.")];
    store.save_index(&replacement, "hash-b").expect("save");

    assert!(store.query(&["wolves".to_string()], 10).is_empty());
    let hits = store.query(&["dice".to_string()], 10);
    assert_eq!(hits.len(), 1);
}

#[test]
fn reopen_preserves_index_and_metadata() {
    let tmp = TempDir::new().expect("tmp");
    {
        let mut store = LexicalIndex::open(tmp.path()).expect("open");
        store.save_index(&sample_chunks(), "hash-a").expect("save");
    }
    let store = LexicalIndex::open(tmp.path()).expect("reopen");
    assert!(store.is_index_current("hash-a"));
    let hits = store.query(&["winter".to_string()], 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source, DocSource::Secondary);
}

#[test]
fn index_with_zero_chunks_is_never_current() {
    let tmp = TempDir::new().expect("tmp");
    let mut store = LexicalIndex::open(tmp.path()).expect("open");
    store.save_index(&[], "hash-a").expect("save");
    // The hash is stamped but the chunk set is empty: a prior partial
    // ingest must not look valid.
    assert!(!store.is_index_current("hash-a"));
}
