//! Nullable persistence gateway: thread-safe in-memory storage for testing.
//!
//! Commits apply to a copy of the state which replaces the live state only
//! when every mutation succeeded, giving the same all-or-nothing behaviour
//! as the LMDB write transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use zonemap_store::{
    BlockLogRecord, BlockLogStore, ChannelRecord, CommitBatch, Mutation, StatsStore, StoreError,
    TopologyReader, TxStatsRecord, ZoneRecord,
};
use zonemap_types::{ChainId, ChannelId, ClientId, ConnectionId, Timestamp};

#[derive(Clone, Debug, Default)]
struct GatewayState {
    zones: HashMap<ChainId, bool>,
    block_log: HashMap<ChainId, BlockLogRecord>,
    tx_stats: HashMap<(ChainId, Timestamp), TxStatsRecord>,
    addresses: HashSet<(ChainId, Timestamp, String)>,
    ibc_stats: HashMap<(ChainId, ChainId, Timestamp), u64>,
    clients: HashMap<(ChainId, ClientId), ChainId>,
    connections: HashMap<(ChainId, ConnectionId), ClientId>,
    channels: HashMap<(ChainId, ChannelId), ChannelRecord>,
}

impl GatewayState {
    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::UpsertZone { chain_id } => {
                self.zones.insert(chain_id.clone(), true);
            }
            Mutation::InsertImplicitZone { chain_id } => {
                self.zones.entry(chain_id.clone()).or_insert(false);
            }
            Mutation::MarkBlock {
                chain_id,
                processed_at,
            } => {
                let log = self.block_log.entry(chain_id.clone()).or_default();
                log.last_processed_block += 1;
                log.last_updated_at = *processed_at;
            }
            Mutation::AddTxStats(stats) => {
                let row = self
                    .tx_stats
                    .entry((stats.chain_id.clone(), stats.hour))
                    .or_default();
                row.count += stats.count;
                row.txs_with_ibc_transfer += stats.txs_with_ibc_transfer;
                for address in &stats.addresses {
                    self.addresses
                        .insert((stats.chain_id.clone(), stats.hour, address.clone()));
                }
            }
            Mutation::InsertClient {
                origin,
                client_id,
                chain_id,
            } => {
                self.clients
                    .entry((origin.clone(), client_id.clone()))
                    .or_insert_with(|| chain_id.clone());
            }
            Mutation::InsertConnection {
                origin,
                connection_id,
                client_id,
            } => {
                self.connections
                    .entry((origin.clone(), connection_id.clone()))
                    .or_insert_with(|| client_id.clone());
            }
            Mutation::InsertChannel {
                origin,
                channel_id,
                connection_id,
            } => {
                self.channels
                    .entry((origin.clone(), channel_id.clone()))
                    .or_insert_with(|| ChannelRecord {
                        connection_id: connection_id.clone(),
                        is_opened: false,
                    });
            }
            Mutation::SetChannelState {
                origin,
                channel_id,
                is_opened,
            } => {
                if let Some(channel) = self.channels.get_mut(&(origin.clone(), channel_id.clone())) {
                    channel.is_opened = *is_opened;
                }
            }
            Mutation::AddIbcStats(stats) => {
                *self
                    .ibc_stats
                    .entry((stats.source.clone(), stats.destination.clone(), stats.hour))
                    .or_default() += stats.count;
            }
        }
    }

    fn client_chain(&self, origin: &ChainId, client_id: &ClientId) -> Option<ChainId> {
        self.clients
            .get(&(origin.clone(), client_id.clone()))
            .cloned()
    }

    fn connection_chain(&self, origin: &ChainId, connection_id: &ConnectionId) -> Option<ChainId> {
        self.connections
            .get(&(origin.clone(), connection_id.clone()))
            .and_then(|client_id| self.client_chain(origin, client_id))
    }
}

/// An in-memory persistence gateway for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullGateway {
    state: Mutex<GatewayState>,
    fail_reads: AtomicBool,
    fail_commit_at: Mutex<Option<usize>>,
    height_reads: AtomicUsize,
    topology_reads: AtomicUsize,
    commits: AtomicUsize,
    last_batch: Mutex<Option<CommitBatch>>,
}

impl NullGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            fail_reads: AtomicBool::new(false),
            fail_commit_at: Mutex::new(None),
            height_reads: AtomicUsize::new(0),
            topology_reads: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            last_batch: Mutex::new(None),
        }
    }

    // ── Seeding ─────────────────────────────────────────────────────────

    /// Pretend `height` blocks of `chain_id` were already committed.
    pub fn seed_height(&self, chain_id: &ChainId, height: u64) {
        self.state.lock().unwrap().block_log.insert(
            chain_id.clone(),
            BlockLogRecord {
                last_processed_block: height,
                last_updated_at: Timestamp::EPOCH,
            },
        );
    }

    pub fn seed_client(&self, origin: &ChainId, client_id: &ClientId, chain_id: &ChainId) {
        self.state
            .lock()
            .unwrap()
            .clients
            .insert((origin.clone(), client_id.clone()), chain_id.clone());
    }

    pub fn seed_connection(&self, origin: &ChainId, connection_id: &ConnectionId, client_id: &ClientId) {
        self.state
            .lock()
            .unwrap()
            .connections
            .insert((origin.clone(), connection_id.clone()), client_id.clone());
    }

    pub fn seed_channel(&self, origin: &ChainId, channel_id: &ChannelId, connection_id: &ConnectionId) {
        self.state.lock().unwrap().channels.insert(
            (origin.clone(), channel_id.clone()),
            ChannelRecord {
                connection_id: connection_id.clone(),
                is_opened: false,
            },
        );
    }

    /// Seed a full `channel -> connection -> client -> counterparty` path
    /// using `connection-N` / `07-tendermint-N` ids derived from the channel.
    pub fn seed_channel_path(&self, origin: &ChainId, channel_id: &ChannelId, counterparty: &ChainId) {
        let suffix = channel_id
            .as_str()
            .rsplit('-')
            .next()
            .unwrap_or_default()
            .to_owned();
        let connection_id = ConnectionId::new(format!("connection-{suffix}"));
        let client_id = ClientId::new(format!("07-tendermint-{suffix}"));
        self.seed_client(origin, &client_id, counterparty);
        self.seed_connection(origin, &connection_id, &client_id);
        self.seed_channel(origin, channel_id, &connection_id);
    }

    // ── Failure injection ───────────────────────────────────────────────

    /// Make every read return a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail the next commits when they reach the mutation at `index`.
    /// `None` disables the injection.
    pub fn fail_commit_at(&self, index: Option<usize>) {
        *self.fail_commit_at.lock().unwrap() = index;
    }

    // ── Introspection ───────────────────────────────────────────────────

    /// Number of `last_processed_block` reads served.
    pub fn height_reads(&self) -> usize {
        self.height_reads.load(Ordering::SeqCst)
    }

    /// Number of client/connection/channel lookups served.
    pub fn topology_reads(&self) -> usize {
        self.topology_reads.load(Ordering::SeqCst)
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// The most recent successfully committed batch.
    pub fn last_batch(&self) -> Option<CommitBatch> {
        self.last_batch.lock().unwrap().clone()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        Ok(())
    }
}

impl Default for NullGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockLogStore for NullGateway {
    fn last_processed_block(&self, chain_id: &ChainId) -> Result<u64, StoreError> {
        self.height_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .block_log
            .get(chain_id)
            .map(|r| r.last_processed_block)
            .unwrap_or(0))
    }

    fn commit(&self, batch: &CommitBatch) -> Result<(), StoreError> {
        let fail_at = *self.fail_commit_at.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();
        for (index, mutation) in batch.iter().enumerate() {
            if fail_at == Some(index) {
                return Err(StoreError::Backend(format!(
                    "injected failure at mutation {index} ({})",
                    mutation.kind()
                )));
            }
            staged.apply(mutation);
        }
        *state = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() = Some(batch.clone());
        Ok(())
    }
}

impl TopologyReader for NullGateway {
    fn chain_id_from_client_id(
        &self,
        origin: &ChainId,
        client_id: &ClientId,
    ) -> Result<Option<ChainId>, StoreError> {
        self.topology_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        Ok(self.state.lock().unwrap().client_chain(origin, client_id))
    }

    fn chain_id_from_connection_id(
        &self,
        origin: &ChainId,
        connection_id: &ConnectionId,
    ) -> Result<Option<ChainId>, StoreError> {
        self.topology_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        Ok(self.state.lock().unwrap().connection_chain(origin, connection_id))
    }

    fn chain_id_from_channel_id(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChainId>, StoreError> {
        self.topology_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .channels
            .get(&(origin.clone(), channel_id.clone()))
            .and_then(|channel| state.connection_chain(origin, &channel.connection_id)))
    }
}

impl StatsStore for NullGateway {
    fn zone(&self, chain_id: &ChainId) -> Result<Option<ZoneRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .zones
            .get(chain_id)
            .map(|&is_enabled| ZoneRecord {
                chain_id: chain_id.clone(),
                is_enabled,
            }))
    }

    fn block_log(&self, chain_id: &ChainId) -> Result<Option<BlockLogRecord>, StoreError> {
        Ok(self.state.lock().unwrap().block_log.get(chain_id).cloned())
    }

    fn tx_stats(
        &self,
        chain_id: &ChainId,
        hour: Timestamp,
    ) -> Result<Option<TxStatsRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tx_stats
            .get(&(chain_id.clone(), hour.truncate_to_hour()))
            .cloned())
    }

    fn active_address_count(
        &self,
        chain_id: &ChainId,
        hour: Timestamp,
    ) -> Result<u64, StoreError> {
        let hour = hour.truncate_to_hour();
        Ok(self
            .state
            .lock()
            .unwrap()
            .addresses
            .iter()
            .filter(|(chain, h, _)| chain == chain_id && *h == hour)
            .count() as u64)
    }

    fn ibc_stats(
        &self,
        source: &ChainId,
        destination: &ChainId,
        hour: Timestamp,
    ) -> Result<u64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .ibc_stats
            .get(&(source.clone(), destination.clone(), hour.truncate_to_hour()))
            .copied()
            .unwrap_or(0))
    }

    fn channel(
        &self,
        origin: &ChainId,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .channels
            .get(&(origin.clone(), channel_id.clone()))
            .cloned())
    }
}
