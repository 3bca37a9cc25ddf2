//! LMDB implementation of BlockLogStore.

use zonemap_store::{BlockLogRecord, BlockLogStore, CommitBatch, StoreError};
use zonemap_types::ChainId;

use crate::codec::get_value;
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl BlockLogStore for LmdbEnvironment {
    fn last_processed_block(&self, chain_id: &ChainId) -> Result<u64, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let record: Option<BlockLogRecord> =
            get_value(&self.block_log_db, &rtxn, chain_id.as_str().as_bytes())?;
        Ok(record.map(|r| r.last_processed_block).unwrap_or(0))
    }

    fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError> {
        let mut txn = self.write_batch()?;
        for mutation in batch {
            txn.apply(mutation).map_err(|e| {
                tracing::warn!(
                    chain = %batch.chain_id,
                    mutation = mutation.kind(),
                    error = %e,
                    "batch aborted"
                );
                e
            })?;
        }
        txn.commit()?;
        tracing::trace!(chain = %batch.chain_id, mutations = batch.len(), "batch committed");
        Ok(())
    }
}
