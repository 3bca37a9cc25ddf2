//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use zonemap_store::StoreError;

use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    /// chain -> [`ZoneRecord`](zonemap_store::ZoneRecord)
    pub(crate) zones_db: Database<Bytes, Bytes>,
    /// chain -> [`BlockLogRecord`](zonemap_store::BlockLogRecord)
    pub(crate) block_log_db: Database<Bytes, Bytes>,
    /// (chain, hour) -> [`TxStatsRecord`](zonemap_store::TxStatsRecord)
    pub(crate) tx_stats_db: Database<Bytes, Bytes>,
    /// (chain, hour, address) -> ()
    pub(crate) addresses_db: Database<Bytes, Bytes>,
    /// (source, destination, hour) -> u64
    pub(crate) ibc_stats_db: Database<Bytes, Bytes>,
    /// (origin, client) -> counterparty chain
    pub(crate) clients_db: Database<Bytes, Bytes>,
    /// (origin, connection) -> client
    pub(crate) connections_db: Database<Bytes, Bytes>,
    /// (origin, channel) -> [`ChannelRecord`](zonemap_store::ChannelRecord)
    pub(crate) channels_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Named databases this environment creates.
    pub const DATABASE_COUNT: u32 = 8;

    /// Open or create an LMDB environment at the given path.
    ///
    /// `max_dbs` is raised to [`Self::DATABASE_COUNT`] if smaller.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: the environment is opened once per path by this process and
        // never memory-mapped twice.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(Self::DATABASE_COUNT))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let zones_db = env.create_database(&mut wtxn, Some("zones"))?;
        let block_log_db = env.create_database(&mut wtxn, Some("block_log"))?;
        let tx_stats_db = env.create_database(&mut wtxn, Some("tx_stats"))?;
        let addresses_db = env.create_database(&mut wtxn, Some("active_addresses"))?;
        let ibc_stats_db = env.create_database(&mut wtxn, Some("ibc_stats"))?;
        let clients_db = env.create_database(&mut wtxn, Some("ibc_clients"))?;
        let connections_db = env.create_database(&mut wtxn, Some("ibc_connections"))?;
        let channels_db = env.create_database(&mut wtxn, Some("ibc_channels"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            zones_db,
            block_log_db,
            tx_stats_db,
            addresses_db,
            ibc_stats_db,
            clients_db,
            connections_db,
            channels_db,
        })
    }

    /// The underlying heed environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Begin a write batch. Dropping it without [`WriteBatch::commit`] rolls back.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonemap_store::{BlockLogStore, CommitBatch, Mutation};
    use zonemap_types::{ChainId, Timestamp};

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let nested = dir.path().join("a").join("b");
        LmdbEnvironment::open(&nested, 1, 10 * 1024 * 1024).expect("failed to open env");
        assert!(nested.join("data.mdb").exists());
    }

    #[test]
    fn committed_state_survives_reopen() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let chain = ChainId::new("A");
        {
            let env = LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024)
                .expect("failed to open env");
            let mut batch = CommitBatch::new(chain.clone());
            batch.push(Mutation::MarkBlock {
                chain_id: chain.clone(),
                processed_at: Timestamp::new(5),
            });
            env.commit(&batch).expect("commit");
        }
        let env =
            LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024).expect("failed to reopen");
        assert_eq!(env.last_processed_block(&chain).unwrap(), 1);
    }
}
