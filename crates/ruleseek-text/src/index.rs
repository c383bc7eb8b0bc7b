use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};
use tracing::warn;

use ruleseek_core::types::{Chunk, DocSource, ScoredCandidate};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// Physical layout version. A mismatch on open wipes and recreates the
/// whole index rather than migrating rows; the index is cheap to rebuild
/// from source text.
pub const SCHEMA_VERSION: &str = "1";

const INDEX_DIR: &str = "tantivy";
const META_FILE: &str = "meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    schema_version: String,
    content_hash: String,
    chunk_count: usize,
}

struct Fields {
    id: tantivy::schema::Field,
    source: tantivy::schema::Field,
    seq: tantivy::schema::Field,
    text: tantivy::schema::Field,
}

/// Persistent lexical index store rooted at one directory.
///
/// The tantivy index lives in a subdirectory so `save_index` can wipe and
/// recreate it; `meta.json` beside it carries `{schema_version,
/// content_hash, chunk_count}` and is written only after a successful
/// commit, which keeps the replace-then-stamp ordering.
pub struct LexicalIndex {
    root: PathBuf,
    index: Index,
    fields: Fields,
}

impl LexicalIndex {
    /// Open (or create) the store at `root`, hard-resetting it when the
    /// stored schema version differs from the expected one.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        if let Some(meta) = read_meta(root) {
            if meta.schema_version != SCHEMA_VERSION {
                warn!(
                    stored = %meta.schema_version,
                    expected = %SCHEMA_VERSION,
                    "lexical index schema changed, wiping"
                );
                wipe(root)?;
            }
        }
        let index_dir = root.join(INDEX_DIR);
        let index = if index_dir.exists() {
            Index::open_in_dir(&index_dir)?
        } else {
            std::fs::create_dir_all(&index_dir)?;
            Index::create_in_dir(&index_dir, build_schema())?
        };
        register_tokenizer(&index);
        let fields = lookup_fields(&index)?;
        Ok(Self { root: root.to_path_buf(), index, fields })
    }

    pub fn is_index_current(&self, hash: &str) -> bool {
        read_meta(&self.root)
            .map(|m| m.content_hash == hash && m.chunk_count > 0)
            .unwrap_or(false)
    }

    pub fn chunk_count(&self) -> usize {
        read_meta(&self.root).map(|m| m.chunk_count).unwrap_or(0)
    }

    /// Replace all stored chunks, then stamp the new content hash.
    ///
    /// The metadata file is deleted before the rebuild starts, so a crash
    /// mid-write leaves a store that reports stale on the next launch
    /// instead of a stamped hash over missing chunks.
    pub fn save_index(&mut self, chunks: &[Chunk], hash: &str) -> Result<()> {
        let meta_path = self.root.join(META_FILE);
        if meta_path.exists() {
            std::fs::remove_file(&meta_path)?;
        }

        let index_dir = self.root.join(INDEX_DIR);
        if index_dir.exists() {
            std::fs::remove_dir_all(&index_dir)?;
        }
        std::fs::create_dir_all(&index_dir)?;
        let index = Index::create_in_dir(&index_dir, build_schema())?;
        register_tokenizer(&index);
        let fields = lookup_fields(&index)?;

        let mut writer = index.writer(50_000_000)?;
        for c in chunks {
            writer.add_document(doc!(
                fields.id => c.id.clone(),
                fields.source => c.source.to_string(),
                fields.seq => c.seq_index as u64,
                fields.text => c.text.clone(),
            ))?;
        }
        writer.commit()?;

        let meta = IndexMeta {
            schema_version: SCHEMA_VERSION.to_string(),
            content_hash: hash.to_string(),
            chunk_count: chunks.len(),
        };
        std::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)?;

        self.index = index;
        self.fields = lookup_fields(&self.index)?;
        Ok(())
    }

    /// Conjunctive BM25 query: every keyword must match (after stemming).
    /// Read errors degrade to an empty result, which already means "no
    /// relevant chunk".
    pub fn query(&self, keywords: &[String], limit: usize) -> Vec<ScoredCandidate> {
        match self.try_query(keywords, limit) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "lexical query failed, returning no candidates");
                Vec::new()
            }
        }
    }

    fn try_query(&self, keywords: &[String], limit: usize) -> Result<Vec<ScoredCandidate>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let mut parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
        parser.set_conjunction_by_default();
        let query = parser.parse_query(&keywords.join(" "))?;
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let source = doc
                .get_first(self.fields.source)
                .and_then(|v| v.as_str())
                .and_then(|s| DocSource::from_str(s).ok());
            let seq = doc.get_first(self.fields.seq).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            let text = doc
                .get_first(self.fields.text)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let Some(source) = source else { continue };
            hits.push(ScoredCandidate {
                chunk: Chunk { id, source, text, seq_index: seq },
                score,
            });
        }
        // BM25 scores arrive ranked already; keep the ordering explicit for
        // the selector's early-exit contract.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }
}

fn lookup_fields(index: &Index) -> Result<Fields> {
    let schema = index.schema();
    Ok(Fields {
        id: schema.get_field("id")?,
        source: schema.get_field("source")?,
        seq: schema.get_field("seq")?,
        text: schema.get_field("text")?,
    })
}

fn read_meta(root: &Path) -> Option<IndexMeta> {
    let bytes = std::fs::read(root.join(META_FILE)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn wipe(root: &Path) -> Result<()> {
    let meta = root.join(META_FILE);
    if meta.exists() {
        std::fs::remove_file(meta)?;
    }
    let index_dir = root.join(INDEX_DIR);
    if index_dir.exists() {
        std::fs::remove_dir_all(index_dir)?;
    }
    Ok(())
}
