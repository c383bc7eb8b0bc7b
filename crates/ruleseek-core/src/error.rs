use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Storage failed: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
