//! ruleseek-vector
//!
//! LanceDB-backed vector index store: chunk rows with fixed-size embedding
//! columns, nearest-neighbor queries, and a small key/value meta table
//! holding the content hash and schema version.

pub mod schema;
pub mod store;

pub use store::VectorStore;
