//! Validation errors for the shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("block has an empty chain id")]
    EmptyChainId,

    #[error("block height must be positive, got {0}")]
    InvalidHeight(u64),

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}
