use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored row exists but cannot be decoded.
    #[error("database is corrupted: {0}")]
    Corruption(String),
}
