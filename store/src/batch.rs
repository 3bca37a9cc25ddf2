//! The unit of persistence: one ordered, all-or-nothing batch per block.
//!
//! Every mutation is a merge (insert-or-add, insert-if-absent, or
//! update-if-exists), so applying a batch never needs to read values the
//! processor computed earlier.

use serde::{Deserialize, Serialize};
use zonemap_types::{
    ChainId, ChannelId, ClientId, ConnectionId, IbcStats, Timestamp, TxStats,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Create the zone enabled, or enable it if it exists disabled.
    UpsertZone { chain_id: ChainId },
    /// Create a disabled zone if absent. Never touches an existing zone.
    InsertImplicitZone { chain_id: ChainId },
    /// Increment `last_processed_block` by one and stamp `processed_at`.
    MarkBlock {
        chain_id: ChainId,
        processed_at: Timestamp,
    },
    /// Add counts to the `(chain, hour)` row and union the address set.
    AddTxStats(TxStats),
    InsertClient {
        origin: ChainId,
        client_id: ClientId,
        chain_id: ChainId,
    },
    InsertConnection {
        origin: ChainId,
        connection_id: ConnectionId,
        client_id: ClientId,
    },
    /// Insert a channel as not yet opened.
    InsertChannel {
        origin: ChainId,
        channel_id: ChannelId,
        connection_id: ConnectionId,
    },
    /// Update `is_opened` of an existing channel; unknown channels are left alone.
    SetChannelState {
        origin: ChainId,
        channel_id: ChannelId,
        is_opened: bool,
    },
    /// Add `count` to the `(source, destination, hour)` row.
    AddIbcStats(IbcStats),
}

impl Mutation {
    /// Short name for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::UpsertZone { .. } => "upsert_zone",
            Mutation::InsertImplicitZone { .. } => "insert_implicit_zone",
            Mutation::MarkBlock { .. } => "mark_block",
            Mutation::AddTxStats(_) => "add_tx_stats",
            Mutation::InsertClient { .. } => "insert_client",
            Mutation::InsertConnection { .. } => "insert_connection",
            Mutation::InsertChannel { .. } => "insert_channel",
            Mutation::SetChannelState { .. } => "set_channel_state",
            Mutation::AddIbcStats(_) => "add_ibc_stats",
        }
    }
}

/// Mutations for one block of one zone, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBatch {
    pub chain_id: ChainId,
    mutations: Vec<Mutation>,
}

impl CommitBatch {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            mutations: Vec::new(),
        }
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl<'a> IntoIterator for &'a CommitBatch {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}
