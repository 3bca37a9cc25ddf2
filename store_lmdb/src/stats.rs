//! LMDB implementation of StatsStore.

use zonemap_store::{
    BlockLogRecord, ChannelRecord, StatsStore, StoreError, TxStatsRecord, ZoneRecord,
};
use zonemap_types::{ChainId, ChannelId, Timestamp};

use crate::codec::get_value;
use crate::environment::LmdbEnvironment;
use crate::{keys, LmdbError};

impl StatsStore for LmdbEnvironment {
    fn zone(&self, chain_id: &ChainId) -> Result<Option<ZoneRecord>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.zones_db, &rtxn, chain_id.as_str().as_bytes())?)
    }

    fn block_log(&self, chain_id: &ChainId) -> Result<Option<BlockLogRecord>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(get_value(&self.block_log_db, &rtxn, chain_id.as_str().as_bytes())?)
    }

    fn tx_stats(
        &self,
        chain_id: &ChainId,
        hour: Timestamp,
    ) -> Result<Option<TxStatsRecord>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let key = keys::hourly(chain_id.as_str(), hour.truncate_to_hour());
        Ok(get_value(&self.tx_stats_db, &rtxn, &key)?)
    }

    fn active_address_count(
        &self,
        chain_id: &ChainId,
        hour: Timestamp,
    ) -> Result<u64, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let prefix = keys::hourly(chain_id.as_str(), hour.truncate_to_hour());
        let mut count = 0u64;
        for entry in self
            .addresses_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?
        {
            entry.map_err(LmdbError::from)?;
            count += 1;
        }
        Ok(count)
    }

    fn ibc_stats(
        &self,
        source: &ChainId,
        destination: &ChainId,
        hour: Timestamp,
    ) -> Result<u64, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let key = keys::ibc(source.as_str(), destination.as_str(), hour.truncate_to_hour());
        let count: Option<u64> = get_value(&self.ibc_stats_db, &rtxn, &key)?;
        Ok(count.unwrap_or(0))
    }

    fn channel(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelRecord>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let key = keys::scoped(origin.as_str(), channel_id.as_str());
        Ok(get_value(&self.channels_db, &rtxn, &key)?)
    }
}
