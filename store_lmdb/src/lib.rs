//! LMDB persistence gateway for the zonemap processor.
//!
//! Implements the traits from `zonemap-store` using the `heed` LMDB bindings.
//! Each logical table maps to one LMDB database within a single environment,
//! and every [`CommitBatch`](zonemap_store::CommitBatch) is applied inside one
//! write transaction.

pub mod block_log;
mod codec;
pub mod environment;
pub mod error;
mod keys;
pub mod stats;
pub mod topology;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use write_batch::WriteBatch;
