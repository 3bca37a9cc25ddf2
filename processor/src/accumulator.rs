//! Per-block statistics and topology accumulator.
//!
//! One accumulator lives inside the processor and is reset before every
//! block. It collects what the block's messages reveal and turns it into a
//! single [`CommitBatch`]; nothing reaches persistence any other way.

use std::collections::{BTreeMap, BTreeSet};

use zonemap_store::{CommitBatch, Mutation};
use zonemap_types::{ChainId, ChannelId, ClientId, ConnectionId, IbcData, Timestamp, TxStats};

/// IBC identifiers created in the block being processed.
///
/// These links are ephemeral: they feed durable topology through the
/// commit batch and the resolver's same-block tier, then are cleared.
#[derive(Debug, Default)]
pub struct BlockTopology {
    clients: BTreeMap<ClientId, ChainId>,
    connections: BTreeMap<ConnectionId, ClientId>,
    channels: BTreeMap<ChannelId, ConnectionId>,
}

impl BlockTopology {
    pub fn chain_of_client(&self, client_id: &ClientId) -> Option<&ChainId> {
        self.clients.get(client_id)
    }

    pub fn client_of_connection(&self, connection_id: &ConnectionId) -> Option<&ClientId> {
        self.connections.get(connection_id)
    }

    pub fn connection_of_channel(&self, channel_id: &ChannelId) -> Option<&ConnectionId> {
        self.channels.get(channel_id)
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.connections.is_empty() && self.channels.is_empty()
    }

    fn clear(&mut self) {
        self.clients.clear();
        self.connections.clear();
        self.channels.clear();
    }
}

#[derive(Debug, Default)]
pub struct StatsAccumulator {
    chain_id: ChainId,
    add_zone: bool,
    processed_at: Option<Timestamp>,
    tx_stats: Option<TxStats>,
    topology: BlockTopology,
    channel_states: BTreeMap<ChannelId, bool>,
    ibc: IbcData,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything collected so far and start collecting for `chain_id`.
    pub fn reset(&mut self, chain_id: ChainId) {
        self.chain_id = chain_id;
        self.add_zone = false;
        self.processed_at = None;
        self.tx_stats = None;
        self.topology.clear();
        self.channel_states.clear();
        self.ibc = IbcData::new();
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    /// Register the reporting zone as an enabled zone.
    pub fn add_zone(&mut self) {
        self.add_zone = true;
    }

    /// Record the block as processed when the batch commits.
    pub fn mark_block(&mut self, processed_at: Timestamp) {
        self.processed_at = Some(processed_at);
    }

    /// Merge volume for the block. Calling twice adds the counts.
    pub fn add_tx_stats(&mut self, stats: TxStats) {
        if let Some(current) = self.tx_stats.as_mut().filter(|c| c.hour == stats.hour) {
            current.count += stats.count;
            current.txs_with_ibc_transfer += stats.txs_with_ibc_transfer;
            current.addresses.extend(stats.addresses);
            return;
        }
        self.tx_stats = Some(stats);
    }

    pub fn add_client(&mut self, client_id: ClientId, counterparty: ChainId) {
        self.topology.clients.insert(client_id, counterparty);
    }

    pub fn add_connection(&mut self, connection_id: ConnectionId, client_id: ClientId) {
        self.topology.connections.insert(connection_id, client_id);
    }

    pub fn add_channel(&mut self, channel_id: ChannelId, connection_id: ConnectionId) {
        self.topology.channels.insert(channel_id, connection_id);
    }

    /// Last write within a block wins.
    pub fn set_channel_state(&mut self, channel_id: ChannelId, is_opened: bool) {
        self.channel_states.insert(channel_id, is_opened);
    }

    pub fn add_ibc_transfer(&mut self, source: &ChainId, destination: &ChainId, time: Timestamp) {
        self.ibc.append(source, destination, time);
    }

    pub fn topology(&self) -> &BlockTopology {
        &self.topology
    }

    pub fn ibc_data(&self) -> &IbcData {
        &self.ibc
    }

    pub fn channel_state(&self, channel_id: &ChannelId) -> Option<bool> {
        self.channel_states.get(channel_id).copied()
    }

    /// Build the commit batch for the collected block and reset.
    ///
    /// Order: zone, block mark, volume, implicit counterparty zones,
    /// clients, connections, channels, channel states, IBC transfers.
    pub fn take_batch(&mut self) -> CommitBatch {
        let origin = self.chain_id.clone();
        let mut batch = CommitBatch::new(origin.clone());

        if self.add_zone {
            batch.push(Mutation::UpsertZone {
                chain_id: origin.clone(),
            });
        }
        if let Some(processed_at) = self.processed_at {
            batch.push(Mutation::MarkBlock {
                chain_id: origin.clone(),
                processed_at,
            });
        }
        if let Some(stats) = self.tx_stats.take().filter(|s| !s.is_empty()) {
            batch.push(Mutation::AddTxStats(stats));
        }

        let counterparties: BTreeSet<&ChainId> = self.topology.clients.values().collect();
        for chain_id in counterparties {
            batch.push(Mutation::InsertImplicitZone {
                chain_id: chain_id.clone(),
            });
        }
        for (client_id, chain_id) in &self.topology.clients {
            batch.push(Mutation::InsertClient {
                origin: origin.clone(),
                client_id: client_id.clone(),
                chain_id: chain_id.clone(),
            });
        }
        for (connection_id, client_id) in &self.topology.connections {
            batch.push(Mutation::InsertConnection {
                origin: origin.clone(),
                connection_id: connection_id.clone(),
                client_id: client_id.clone(),
            });
        }
        for (channel_id, connection_id) in &self.topology.channels {
            batch.push(Mutation::InsertChannel {
                origin: origin.clone(),
                channel_id: channel_id.clone(),
                connection_id: connection_id.clone(),
            });
        }
        for (channel_id, is_opened) in &self.channel_states {
            batch.push(Mutation::SetChannelState {
                origin: origin.clone(),
                channel_id: channel_id.clone(),
                is_opened: *is_opened,
            });
        }
        for stats in self.ibc.to_ibc_stats() {
            batch.push(Mutation::AddIbcStats(stats));
        }

        self.reset(origin);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(s: &str) -> ChainId {
        ChainId::new(s)
    }

    fn kinds(batch: &CommitBatch) -> Vec<&'static str> {
        batch.iter().map(Mutation::kind).collect()
    }

    #[test]
    fn batch_follows_commit_order() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_zone();
        acc.mark_block(Timestamp::new(100));
        let mut stats = TxStats::new(chain("A"), Timestamp::new(100));
        stats.record_tx(false);
        acc.add_tx_stats(stats);
        acc.add_ibc_transfer(&chain("A"), &chain("B"), Timestamp::new(100));
        acc.set_channel_state(ChannelId::new("channel-0"), true);
        acc.add_channel(ChannelId::new("channel-0"), ConnectionId::new("connection-0"));
        acc.add_connection(ConnectionId::new("connection-0"), ClientId::new("07-tendermint-0"));
        acc.add_client(ClientId::new("07-tendermint-0"), chain("B"));

        let batch = acc.take_batch();
        assert_eq!(
            kinds(&batch),
            vec![
                "upsert_zone",
                "mark_block",
                "add_tx_stats",
                "insert_implicit_zone",
                "insert_client",
                "insert_connection",
                "insert_channel",
                "set_channel_state",
                "add_ibc_stats",
            ]
        );
    }

    #[test]
    fn zero_volume_is_not_committed() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_zone();
        acc.mark_block(Timestamp::new(0));
        acc.add_tx_stats(TxStats::new(chain("A"), Timestamp::new(0)));
        assert_eq!(kinds(&acc.take_batch()), vec!["upsert_zone", "mark_block"]);
    }

    #[test]
    fn channel_state_last_write_wins() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        let chan = ChannelId::new("channel-1");
        acc.set_channel_state(chan.clone(), true);
        acc.set_channel_state(chan.clone(), false);
        assert_eq!(acc.channel_state(&chan), Some(false));

        let batch = acc.take_batch();
        assert_eq!(
            batch.mutations(),
            &[Mutation::SetChannelState {
                origin: chain("A"),
                channel_id: chan,
                is_opened: false,
            }]
        );
    }

    #[test]
    fn repeated_transfers_coalesce_into_one_row() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_ibc_transfer(&chain("A"), &chain("B"), Timestamp::new(1_619_879_832));
        acc.add_ibc_transfer(&chain("A"), &chain("B"), Timestamp::new(1_619_878_000));

        let batch = acc.take_batch();
        assert_eq!(batch.len(), 1);
        match &batch.mutations()[0] {
            Mutation::AddIbcStats(stats) => {
                assert_eq!(stats.count, 2);
                assert_eq!(stats.hour, Timestamp::new(1_619_877_600));
            }
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn implicit_zones_are_deduplicated() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_client(ClientId::new("07-tendermint-0"), chain("B"));
        acc.add_client(ClientId::new("07-tendermint-1"), chain("B"));

        let batch = acc.take_batch();
        let implicit = batch
            .iter()
            .filter(|m| matches!(m, Mutation::InsertImplicitZone { .. }))
            .count();
        assert_eq!(implicit, 1);
    }

    #[test]
    fn take_batch_resets_state() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_zone();
        acc.add_client(ClientId::new("07-tendermint-0"), chain("B"));
        acc.add_ibc_transfer(&chain("A"), &chain("B"), Timestamp::new(0));
        let _ = acc.take_batch();

        assert!(acc.topology().is_empty());
        assert!(acc.ibc_data().is_empty());
        assert!(acc.take_batch().is_empty());
        assert_eq!(acc.chain_id(), &chain("A"));
    }

    #[test]
    fn reset_discards_previous_block() {
        let mut acc = StatsAccumulator::new();
        acc.reset(chain("A"));
        acc.add_zone();
        acc.add_channel(ChannelId::new("channel-0"), ConnectionId::new("connection-0"));
        acc.reset(chain("B"));

        assert!(acc.topology().connection_of_channel(&ChannelId::new("channel-0")).is_none());
        let batch = acc.take_batch();
        assert!(batch.is_empty());
        assert_eq!(batch.chain_id, chain("B"));
    }
}
