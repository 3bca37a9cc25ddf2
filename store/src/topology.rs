//! Read side of the durable IBC topology.
//!
//! Every lookup is scoped by the `origin` zone that issued the identifier.
//! `Ok(None)` means the link is not known; it is never an empty id.

use zonemap_types::{ChainId, ChannelId, ClientId, ConnectionId};

use crate::StoreError;

pub trait TopologyReader {
    /// Counterparty zone of a light client.
    fn chain_id_from_client_id(
        &self,
        origin: &ChainId,
        client_id: &ClientId,
    ) -> Result<Option<ChainId>, StoreError>;

    /// Counterparty zone of a connection (connection -> client -> zone).
    fn chain_id_from_connection_id(
        &self,
        origin: &ChainId,
        connection_id: &ConnectionId,
    ) -> Result<Option<ChainId>, StoreError>;

    /// Counterparty zone of a channel (channel -> connection -> client -> zone).
    fn chain_id_from_channel_id(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChainId>, StoreError>;
}
