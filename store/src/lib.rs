//! Persistence gateway traits for the zonemap processor.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The processor depends only on the traits: it reads through
//! [`TopologyReader`] and [`BlockLogStore`] and writes exclusively through
//! one atomic [`CommitBatch`] per block.

pub mod batch;
pub mod block_log;
pub mod error;
pub mod stats;
pub mod topology;

pub use batch::{CommitBatch, Mutation};
pub use block_log::{BlockLogRecord, BlockLogStore};
pub use error::StoreError;
pub use stats::{ChannelRecord, StatsStore, TxStatsRecord, ZoneRecord};
pub use topology::TopologyReader;

/// Everything the block processor needs from persistence.
pub trait PersistenceGateway: BlockLogStore + TopologyReader {}

impl<T: BlockLogStore + TopologyReader + ?Sized> PersistenceGateway for T {}
