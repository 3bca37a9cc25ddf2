//! Write batching: applies one [`CommitBatch`] inside a single LMDB write
//! transaction.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! for mutation in &commit_batch {
//!     batch.apply(mutation)?;
//! }
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::types::Bytes;
use heed::{Database, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use zonemap_store::{
    BlockLogRecord, ChannelRecord, Mutation, StoreError, TxStatsRecord, ZoneRecord,
};
use zonemap_types::{ChainId, ChannelId, ClientId, ConnectionId, IbcStats, Timestamp, TxStats};

use crate::codec::{encode, get_value};
use crate::environment::LmdbEnvironment;
use crate::{keys, LmdbError};

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    fn get<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        Ok(get_value(&db, &self.txn, key)?)
    }

    fn put<T: Serialize>(
        &mut self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = encode(value)?;
        db.put(&mut self.txn, key, &bytes).map_err(LmdbError::from)?;
        Ok(())
    }

    fn exists(&self, db: Database<Bytes, Bytes>, key: &[u8]) -> Result<bool, StoreError> {
        Ok(db.get(&self.txn, key).map_err(LmdbError::from)?.is_some())
    }

    /// Apply one mutation with its merge rule.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::UpsertZone { chain_id } => self.upsert_zone(chain_id),
            Mutation::InsertImplicitZone { chain_id } => self.insert_implicit_zone(chain_id),
            Mutation::MarkBlock {
                chain_id,
                processed_at,
            } => self.mark_block(chain_id, *processed_at),
            Mutation::AddTxStats(stats) => self.add_tx_stats(stats),
            Mutation::InsertClient {
                origin,
                client_id,
                chain_id,
            } => self.insert_client(origin, client_id, chain_id),
            Mutation::InsertConnection {
                origin,
                connection_id,
                client_id,
            } => self.insert_connection(origin, connection_id, client_id),
            Mutation::InsertChannel {
                origin,
                channel_id,
                connection_id,
            } => self.insert_channel(origin, channel_id, connection_id),
            Mutation::SetChannelState {
                origin,
                channel_id,
                is_opened,
            } => self.set_channel_state(origin, channel_id, *is_opened),
            Mutation::AddIbcStats(stats) => self.add_ibc_stats(stats),
        }
    }

    // ── Zones ───────────────────────────────────────────────────────────

    /// Create the zone enabled, or enable a disabled one.
    pub fn upsert_zone(&mut self, chain_id: &ChainId) -> Result<(), StoreError> {
        let key = chain_id.as_str().as_bytes();
        match self.get::<ZoneRecord>(self.env.zones_db, key)? {
            Some(zone) if zone.is_enabled => Ok(()),
            _ => self.put(
                self.env.zones_db,
                key,
                &ZoneRecord {
                    chain_id: chain_id.clone(),
                    is_enabled: true,
                },
            ),
        }
    }

    /// Create a disabled zone unless one already exists.
    pub fn insert_implicit_zone(&mut self, chain_id: &ChainId) -> Result<(), StoreError> {
        let key = chain_id.as_str().as_bytes();
        if self.exists(self.env.zones_db, key)? {
            return Ok(());
        }
        self.put(
            self.env.zones_db,
            key,
            &ZoneRecord {
                chain_id: chain_id.clone(),
                is_enabled: false,
            },
        )
    }

    // ── Block log ───────────────────────────────────────────────────────

    pub fn mark_block(
        &mut self,
        chain_id: &ChainId,
        processed_at: Timestamp,
    ) -> Result<(), StoreError> {
        let key = chain_id.as_str().as_bytes();
        let mut record: BlockLogRecord = self.get(self.env.block_log_db, key)?.unwrap_or_default();
        record.last_processed_block += 1;
        record.last_updated_at = processed_at;
        self.put(self.env.block_log_db, key, &record)
    }

    // ── Statistics ──────────────────────────────────────────────────────

    /// Add volume to the `(chain, hour)` row and record its senders.
    pub fn add_tx_stats(&mut self, stats: &TxStats) -> Result<(), StoreError> {
        let key = keys::hourly(stats.chain_id.as_str(), stats.hour);
        let mut record: TxStatsRecord = self.get(self.env.tx_stats_db, &key)?.unwrap_or_default();
        record.count += stats.count;
        record.txs_with_ibc_transfer += stats.txs_with_ibc_transfer;
        self.put(self.env.tx_stats_db, &key, &record)?;

        let addresses_db = self.env.addresses_db;
        for address in &stats.addresses {
            let key = keys::address(stats.chain_id.as_str(), stats.hour, address);
            addresses_db
                .put(&mut self.txn, &key, &[])
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    pub fn add_ibc_stats(&mut self, stats: &IbcStats) -> Result<(), StoreError> {
        let key = keys::ibc(stats.source.as_str(), stats.destination.as_str(), stats.hour);
        let count: u64 = self.get(self.env.ibc_stats_db, &key)?.unwrap_or(0);
        self.put(self.env.ibc_stats_db, &key, &(count + stats.count))
    }

    // ── Topology ────────────────────────────────────────────────────────

    pub fn insert_client(
        &mut self,
        origin: &ChainId,
        client_id: &ClientId,
        chain_id: &ChainId,
    ) -> Result<(), StoreError> {
        let key = keys::scoped(origin.as_str(), client_id.as_str());
        if self.exists(self.env.clients_db, &key)? {
            return Ok(());
        }
        self.put(self.env.clients_db, &key, chain_id)
    }

    pub fn insert_connection(
        &mut self,
        origin: &ChainId,
        connection_id: &ConnectionId,
        client_id: &ClientId,
    ) -> Result<(), StoreError> {
        let key = keys::scoped(origin.as_str(), connection_id.as_str());
        if self.exists(self.env.connections_db, &key)? {
            return Ok(());
        }
        self.put(self.env.connections_db, &key, client_id)
    }

    pub fn insert_channel(
        &mut self,
        origin: &ChainId,
        channel_id: &ChannelId,
        connection_id: &ConnectionId,
    ) -> Result<(), StoreError> {
        let key = keys::scoped(origin.as_str(), channel_id.as_str());
        if self.exists(self.env.channels_db, &key)? {
            return Ok(());
        }
        self.put(
            self.env.channels_db,
            &key,
            &ChannelRecord {
                connection_id: connection_id.clone(),
                is_opened: false,
            },
        )
    }

    pub fn set_channel_state(
        &mut self,
        origin: &ChainId,
        channel_id: &ChannelId,
        is_opened: bool,
    ) -> Result<(), StoreError> {
        let key = keys::scoped(origin.as_str(), channel_id.as_str());
        let Some(mut channel) = self.get::<ChannelRecord>(self.env.channels_db, &key)? else {
            tracing::debug!(%origin, %channel_id, "state change for unknown channel ignored");
            return Ok(());
        };
        channel.is_opened = is_opened;
        self.put(self.env.channels_db, &key, &channel)
    }

    // ── Commit / rollback ───────────────────────────────────────────────

    /// Commit all batched operations in a single write transaction.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonemap_store::{BlockLogStore, StatsStore, TopologyReader};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024)
            .expect("failed to open env");
        (dir, env)
    }

    fn chain(s: &str) -> ChainId {
        ChainId::new(s)
    }

    #[test]
    fn upsert_zone_enables_implicit_zone() {
        let (_dir, env) = temp_env();

        let mut batch = env.write_batch().expect("write_batch");
        batch.insert_implicit_zone(&chain("B")).expect("implicit");
        batch.commit().expect("commit");
        assert!(!env.zone(&chain("B")).unwrap().unwrap().is_enabled);

        let mut batch = env.write_batch().expect("write_batch");
        batch.upsert_zone(&chain("B")).expect("upsert");
        batch.commit().expect("commit");
        assert!(env.zone(&chain("B")).unwrap().unwrap().is_enabled);
    }

    #[test]
    fn implicit_zone_never_disables_enabled_zone() {
        let (_dir, env) = temp_env();

        let mut batch = env.write_batch().expect("write_batch");
        batch.upsert_zone(&chain("A")).expect("upsert");
        batch.insert_implicit_zone(&chain("A")).expect("implicit");
        batch.commit().expect("commit");

        assert!(env.zone(&chain("A")).unwrap().unwrap().is_enabled);
    }

    #[test]
    fn mark_block_increments_and_stamps() {
        let (_dir, env) = temp_env();

        let mut batch = env.write_batch().expect("write_batch");
        batch.mark_block(&chain("A"), Timestamp::new(10)).expect("mark");
        batch.mark_block(&chain("A"), Timestamp::new(20)).expect("mark");
        batch.commit().expect("commit");

        let log = env.block_log(&chain("A")).unwrap().unwrap();
        assert_eq!(log.last_processed_block, 2);
        assert_eq!(log.last_updated_at, Timestamp::new(20));
        assert_eq!(env.last_processed_block(&chain("A")).unwrap(), 2);
    }

    #[test]
    fn tx_stats_add_and_union_addresses() {
        let (_dir, env) = temp_env();
        let hour = Timestamp::new(7200);

        for sender in ["addr1", "addr2"] {
            let mut stats = TxStats::new(chain("A"), hour);
            stats.record_tx(true);
            stats.record_tx(false);
            stats.add_address("addr1");
            stats.add_address(sender);
            let mut batch = env.write_batch().expect("write_batch");
            batch.add_tx_stats(&stats).expect("tx stats");
            batch.commit().expect("commit");
        }

        let record = env.tx_stats(&chain("A"), hour).unwrap().unwrap();
        assert_eq!(record.count, 4);
        assert_eq!(record.txs_with_ibc_transfer, 2);
        assert_eq!(env.active_address_count(&chain("A"), hour).unwrap(), 2);
        assert_eq!(
            env.active_address_count(&chain("A"), Timestamp::new(3600)).unwrap(),
            0
        );
    }

    #[test]
    fn ibc_stats_accumulate_per_key() {
        let (_dir, env) = temp_env();
        let hour = Timestamp::new(3600);
        let row = IbcStats {
            source: chain("A"),
            destination: chain("B"),
            hour,
            count: 2,
        };

        let mut batch = env.write_batch().expect("write_batch");
        batch.add_ibc_stats(&row).expect("ibc");
        batch.add_ibc_stats(&row).expect("ibc");
        batch.commit().expect("commit");

        assert_eq!(env.ibc_stats(&chain("A"), &chain("B"), hour).unwrap(), 4);
        assert_eq!(env.ibc_stats(&chain("B"), &chain("A"), hour).unwrap(), 0);
    }

    #[test]
    fn topology_rows_are_insert_if_absent() {
        let (_dir, env) = temp_env();
        let client = ClientId::new("07-tendermint-0");

        let mut batch = env.write_batch().expect("write_batch");
        batch.insert_client(&chain("A"), &client, &chain("B")).expect("client");
        batch.insert_client(&chain("A"), &client, &chain("C")).expect("client");
        batch.commit().expect("commit");

        assert_eq!(
            env.chain_id_from_client_id(&chain("A"), &client).unwrap(),
            Some(chain("B"))
        );
    }

    #[test]
    fn channel_state_updates_only_existing_channels() {
        let (_dir, env) = temp_env();
        let chan = ChannelId::new("channel-0");
        let other = ChannelId::new("channel-9");

        let mut batch = env.write_batch().expect("write_batch");
        batch
            .insert_channel(&chain("A"), &chan, &ConnectionId::new("connection-0"))
            .expect("channel");
        batch.set_channel_state(&chain("A"), &chan, true).expect("state");
        batch.set_channel_state(&chain("A"), &other, true).expect("state");
        batch.commit().expect("commit");

        assert!(env.channel(&chain("A"), &chan).unwrap().unwrap().is_opened);
        assert!(env.channel(&chain("A"), &other).unwrap().is_none());
    }

    #[test]
    fn dropped_batch_rolls_back() {
        let (_dir, env) = temp_env();

        {
            let mut batch = env.write_batch().expect("write_batch");
            batch.upsert_zone(&chain("A")).expect("upsert");
            batch.mark_block(&chain("A"), Timestamp::new(1)).expect("mark");
            // dropped without commit
        }

        assert!(env.zone(&chain("A")).unwrap().is_none());
        assert_eq!(env.last_processed_block(&chain("A")).unwrap(), 0);
    }
}
