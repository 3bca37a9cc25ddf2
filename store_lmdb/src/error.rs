use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("corrupted value under key {key}: {reason}")]
    Corruption { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for zonemap_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Corruption { .. } => zonemap_store::StoreError::Corruption(e.to_string()),
            LmdbError::Serialization(msg) => zonemap_store::StoreError::Serialization(msg),
            other => zonemap_store::StoreError::Backend(other.to_string()),
        }
    }
}
