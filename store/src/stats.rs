//! Read side of the committed statistics.

use serde::{Deserialize, Serialize};
use zonemap_types::{ChainId, ChannelId, ConnectionId, Timestamp};

use crate::{BlockLogRecord, StoreError};

/// A zone known to the explorer.
///
/// Zones reporting blocks are enabled; zones only seen as a light-client
/// counterparty are created disabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub chain_id: ChainId,
    pub is_enabled: bool,
}

/// Stored volume of one `(zone, hour)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatsRecord {
    pub count: u64,
    pub txs_with_ibc_transfer: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub connection_id: ConnectionId,
    pub is_opened: bool,
}

pub trait StatsStore {
    fn zone(&self, chain_id: &ChainId) -> Result<Option<ZoneRecord>, StoreError>;

    fn block_log(&self, chain_id: &ChainId) -> Result<Option<BlockLogRecord>, StoreError>;

    fn tx_stats(
        &self,
        chain_id: &ChainId,
        hour: Timestamp,
    ) -> Result<Option<TxStatsRecord>, StoreError>;

    /// Distinct senders seen on `chain_id` during `hour`.
    fn active_address_count(&self, chain_id: &ChainId, hour: Timestamp)
        -> Result<u64, StoreError>;

    /// Transfers from `source` to `destination` during `hour`, 0 if none.
    fn ibc_stats(
        &self,
        source: &ChainId,
        destination: &ChainId,
        hour: Timestamp,
    ) -> Result<u64, StoreError>;

    fn channel(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelRecord>, StoreError>;
}
