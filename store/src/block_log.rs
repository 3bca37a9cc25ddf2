//! Per-zone processed-height bookkeeping.

use serde::{Deserialize, Serialize};
use zonemap_types::{ChainId, Timestamp};

use crate::{CommitBatch, StoreError};

/// Last block applied for a zone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLogRecord {
    pub last_processed_block: u64,
    pub last_updated_at: Timestamp,
}

pub trait BlockLogStore {
    /// Height of the last committed block for `chain_id`, 0 if the zone was never seen.
    fn last_processed_block(&self, chain_id: &ChainId) -> Result<u64, StoreError>;

    /// Apply every mutation of `batch`, or none of them.
    fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError>;
}
