use anyhow::Result;
use arrow_array::cast::AsArray;
use arrow_array::{
    FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMillisecondArray,
};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use ruleseek_core::config::EMBEDDING_DIM;
use ruleseek_core::types::{Chunk, DocSource, EmbeddedChunk, ScoredCandidate};

use crate::schema::{build_chunks_schema, build_meta_schema};

/// Physical layout version; a mismatch on open drops every table. No row
/// migration is attempted, the index is rebuilt from source text.
pub const SCHEMA_VERSION: &str = "1";

const CHUNKS_TABLE: &str = "chunks";
const META_TABLE: &str = "meta";
const HASH_KEY: &str = "content_hash";
const VERSION_KEY: &str = "schema_version";

/// LanceDB-backed vector index store with an explicit open lifecycle.
pub struct VectorStore {
    db: Connection,
}

impl VectorStore {
    /// Open the store at `path`, wiping all tables first when the stored
    /// schema version does not match the expected one.
    pub async fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let db = connect(path.to_string_lossy().as_ref()).execute().await?;
        let store = Self { db };
        match store.get_meta(VERSION_KEY).await? {
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) => {
                warn!(stored = %v, expected = %SCHEMA_VERSION, "vector store schema changed, wiping");
                store.drop_all_tables().await?;
                store.set_meta(VERSION_KEY, SCHEMA_VERSION).await?;
            }
            None => {
                store.set_meta(VERSION_KEY, SCHEMA_VERSION).await?;
            }
        }
        Ok(store)
    }

    /// Current means the stamped hash matches and at least one chunk is
    /// stored; a stamped hash over an empty table is a partial prior save.
    pub async fn is_index_current(&self, hash: &str) -> bool {
        match self.get_meta(HASH_KEY).await {
            Ok(Some(stored)) => stored == hash && self.chunk_count().await > 0,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "meta read failed, treating index as stale");
                false
            }
        }
    }

    pub async fn chunk_count(&self) -> usize {
        match self.try_chunk_count().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "chunk count failed, reporting zero");
                0
            }
        }
    }

    async fn try_chunk_count(&self) -> Result<usize> {
        if !self.table_exists(CHUNKS_TABLE).await? {
            return Ok(0);
        }
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        Ok(table.count_rows(None).await?)
    }

    /// Replace all stored chunks and vectors, then stamp the content hash.
    ///
    /// The old hash is blanked before the chunk table is touched: if the
    /// process dies mid-replace, the next launch sees a hash mismatch and
    /// re-ingests instead of trusting half-written rows.
    pub async fn save_index(&self, embedded: &[EmbeddedChunk], hash: &str) -> Result<()> {
        self.set_meta(HASH_KEY, "").await?;

        if self.table_exists(CHUNKS_TABLE).await? {
            self.db.drop_table(CHUNKS_TABLE, &[]).await?;
        }
        let schema = build_chunks_schema();
        if embedded.is_empty() {
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
            self.db.create_table(CHUNKS_TABLE, Box::new(iter)).execute().await?;
        } else {
            let batch = chunks_to_record_batch(embedded)?;
            let iter = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);
            self.db.create_table(CHUNKS_TABLE, Box::new(iter)).execute().await?;
        }

        self.set_meta(HASH_KEY, hash).await?;
        Ok(())
    }

    /// Nearest-neighbor lookup; cosine distance normalized into a 0..1
    /// higher-is-better score. Read errors degrade to an empty result.
    pub async fn query_top_k(&self, vector: &[f32], k: usize) -> Vec<ScoredCandidate> {
        match self.try_query_top_k(vector, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "vector query failed, returning no candidates");
                Vec::new()
            }
        }
    }

    async fn try_query_top_k(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredCandidate>> {
        if !self.table_exists(CHUNKS_TABLE).await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        let mut stream = table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            for i in 0..batch.num_rows() {
                let Some(chunk) = row_to_chunk(&batch, i) else { continue };
                let score = batch
                    .column_by_name("_distance")
                    .and_then(|c| c.as_any().downcast_ref::<arrow_array::Float32Array>())
                    .map(|d| 1.0 - d.value(i))
                    .unwrap_or(0.0);
                hits.push(ScoredCandidate { chunk, score });
            }
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    /// Full enumeration of stored chunks with their vectors, sorted by
    /// source and position. The corpus is small, a plain scan is fine.
    pub async fn get_all_chunks(&self) -> Vec<EmbeddedChunk> {
        match self.try_get_all_chunks().await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "chunk scan failed, returning none");
                Vec::new()
            }
        }
    }

    async fn try_get_all_chunks(&self) -> Result<Vec<EmbeddedChunk>> {
        if !self.table_exists(CHUNKS_TABLE).await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        let mut stream = table.query().execute().await?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let vec_col = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());
            for i in 0..batch.num_rows() {
                let Some(chunk) = row_to_chunk(&batch, i) else { continue };
                let Some(vec_col) = vec_col else { continue };
                let list = vec_col.value(i);
                let vector: Vec<f32> = list
                    .as_primitive::<arrow_array::types::Float32Type>()
                    .values()
                    .iter()
                    .copied()
                    .collect();
                if vector.len() != EMBEDDING_DIM {
                    continue;
                }
                out.push(EmbeddedChunk { chunk, vector });
            }
        }
        out.sort_by_key(|e| (e.chunk.source, e.chunk.seq_index));
        Ok(out)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.db.table_names().execute().await?.contains(&name.to_string()))
    }

    async fn drop_all_tables(&self) -> Result<()> {
        for name in self.db.table_names().execute().await? {
            self.db.drop_table(&name, &[]).await?;
        }
        Ok(())
    }

    async fn ensure_meta_table(&self) -> Result<()> {
        if self.table_exists(META_TABLE).await? {
            return Ok(());
        }
        let iter = RecordBatchIterator::new(vec![].into_iter(), build_meta_schema());
        self.db.create_table(META_TABLE, Box::new(iter)).execute().await?;
        Ok(())
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_meta_table().await?;
        let table = self.db.open_table(META_TABLE).execute().await?;
        let batch = RecordBatch::try_new(
            build_meta_schema(),
            vec![
                Arc::new(StringArray::from(vec![key.to_string()])),
                Arc::new(StringArray::from(vec![value.to_string()])),
                Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
            ],
        )?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), build_meta_schema()));
        // Upsert: key is unique.
        let mut mi = table.merge_insert(&["key"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await?;
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        if !self.table_exists(META_TABLE).await? {
            return Ok(None);
        }
        let table = self.db.open_table(META_TABLE).execute().await?;
        let mut stream = table
            .query()
            .only_if(&format!("key = '{}'", key.replace('\'', "''")))
            .execute()
            .await?;
        while let Some(batch) = stream.try_next().await? {
            if batch.num_rows() == 0 {
                continue;
            }
            let values = batch
                .column_by_name("value")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("meta.value column missing"))?;
            return Ok(Some(values.value(0).to_string()));
        }
        Ok(None)
    }
}

fn row_to_chunk(batch: &RecordBatch, i: usize) -> Option<Chunk> {
    let get_str = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .map(|a| a.value(i).to_string())
    };
    let id = get_str("id")?;
    let source = DocSource::from_str(&get_str("source")?).ok()?;
    let text = get_str("text")?;
    let seq = batch
        .column_by_name("seq")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .map(|a| a.value(i))?;
    Some(Chunk { id, source, text, seq_index: seq as usize })
}

fn chunks_to_record_batch(embedded: &[EmbeddedChunk]) -> Result<RecordBatch> {
    let mut ids = Vec::new();
    let mut sources = Vec::new();
    let mut seqs = Vec::new();
    let mut texts = Vec::new();
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
    for e in embedded {
        // FixedSizeListArray construction panics on a length mismatch;
        // reject malformed vectors here so the caller gets an Err.
        if e.vector.len() != EMBEDDING_DIM {
            anyhow::bail!(
                "chunk {} carries a {}-dim vector, expected {}",
                e.chunk.id,
                e.vector.len(),
                EMBEDDING_DIM
            );
        }
        ids.push(e.chunk.id.clone());
        sources.push(e.chunk.source.to_string());
        seqs.push(e.chunk.seq_index as i32);
        texts.push(e.chunk.text.clone());
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        build_chunks_schema(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int32Array::from(seqs)),
            Arc::new(StringArray::from(texts)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors.into_iter(),
                EMBEDDING_DIM as i32,
            )),
        ],
    )?;
    Ok(batch)
}
