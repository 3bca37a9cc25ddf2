//! LMDB implementation of TopologyReader.
//!
//! Multi-hop lookups (channel -> connection -> client -> zone) run inside
//! one read transaction so they observe a single committed state.

use heed::RoTxn;

use zonemap_store::{ChannelRecord, StoreError, TopologyReader};
use zonemap_types::{ChainId, ChannelId, ClientId, ConnectionId};

use crate::codec::get_value;
use crate::environment::LmdbEnvironment;
use crate::{keys, LmdbError};

impl LmdbEnvironment {
    fn client_chain(
        &self,
        rtxn: &RoTxn<'_>,
        origin: &ChainId,
        client_id: &ClientId,
    ) -> Result<Option<ChainId>, LmdbError> {
        let key = keys::scoped(origin.as_str(), client_id.as_str());
        get_value(&self.clients_db, rtxn, &key)
    }

    fn connection_chain(
        &self,
        rtxn: &RoTxn<'_>,
        origin: &ChainId,
        connection_id: &ConnectionId,
    ) -> Result<Option<ChainId>, LmdbError> {
        let key = keys::scoped(origin.as_str(), connection_id.as_str());
        match get_value::<ClientId>(&self.connections_db, rtxn, &key)? {
            Some(client_id) => self.client_chain(rtxn, origin, &client_id),
            None => Ok(None),
        }
    }
}

impl TopologyReader for LmdbEnvironment {
    fn chain_id_from_client_id(
        &self,
        origin: &ChainId,
        client_id: &ClientId,
    ) -> Result<Option<ChainId>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.client_chain(&rtxn, origin, client_id)?)
    }

    fn chain_id_from_connection_id(
        &self,
        origin: &ChainId,
        connection_id: &ConnectionId,
    ) -> Result<Option<ChainId>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.connection_chain(&rtxn, origin, connection_id)?)
    }

    fn chain_id_from_channel_id(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChainId>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let key = keys::scoped(origin.as_str(), channel_id.as_str());
        match get_value::<ChannelRecord>(&self.channels_db, &rtxn, &key)? {
            Some(channel) => Ok(self.connection_chain(&rtxn, origin, &channel.connection_id)?),
            None => Ok(None),
        }
    }
}
