//! Channel → counterparty zone resolution.
//!
//! A channel id is resolved with the cheapest evidence available:
//!
//! 1. the process-lifetime cache, keyed by `(origin, channel)`;
//! 2. links created in the current block (channel → connection → client → zone);
//! 3. a partial same-block path completed by one gateway lookup
//!    (by client, or by connection when the client is not in the block);
//! 4. a full gateway lookup by channel.
//!
//! Every answer, whatever the tier, is cached for the rest of the process.

use std::collections::HashMap;

use zonemap_store::TopologyReader;
use zonemap_types::{ChainId, ChannelId};

use crate::accumulator::BlockTopology;
use crate::error::ProcessorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionTier {
    Cache,
    SameBlock,
    ClientLookup,
    ConnectionLookup,
    ChannelLookup,
}

impl ResolutionTier {
    /// Whether answering required a gateway read.
    pub fn used_gateway(self) -> bool {
        matches!(
            self,
            ResolutionTier::ClientLookup
                | ResolutionTier::ConnectionLookup
                | ResolutionTier::ChannelLookup
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionTier::Cache => "cache",
            ResolutionTier::SameBlock => "same_block",
            ResolutionTier::ClientLookup => "client_lookup",
            ResolutionTier::ConnectionLookup => "connection_lookup",
            ResolutionTier::ChannelLookup => "channel_lookup",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub chain_id: ChainId,
    pub tier: ResolutionTier,
}

/// `(origin, channel) → counterparty`, never evicted.
#[derive(Debug, Default)]
pub struct ChannelCache {
    entries: HashMap<(ChainId, ChannelId), ChainId>,
}

impl ChannelCache {
    pub fn get(&self, origin: &ChainId, channel_id: &ChannelId) -> Option<&ChainId> {
        self.entries.get(&(origin.clone(), channel_id.clone()))
    }

    pub fn insert(&mut self, origin: ChainId, channel_id: ChannelId, counterparty: ChainId) {
        self.entries.insert((origin, channel_id), counterparty);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct TopologyResolver {
    cache: ChannelCache,
}

impl TopologyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ChannelCache {
        &self.cache
    }

    /// Resolve the zone on the other end of `channel_id` as seen from `origin`.
    ///
    /// A failed or empty gateway read is a `Connection` error; nothing is
    /// cached in that case.
    pub fn resolve<R: TopologyReader + ?Sized>(
        &mut self,
        reader: &R,
        origin: &ChainId,
        channel_id: &ChannelId,
        block: &BlockTopology,
    ) -> Result<Resolution, ProcessorError> {
        if let Some(chain_id) = self.cache.get(origin, channel_id) {
            return Ok(Resolution {
                chain_id: chain_id.clone(),
                tier: ResolutionTier::Cache,
            });
        }

        let resolution = lookup(reader, origin, channel_id, block)?;
        tracing::debug!(
            %origin,
            %channel_id,
            counterparty = %resolution.chain_id,
            tier = resolution.tier.as_str(),
            "resolved channel"
        );
        self.cache.insert(
            origin.clone(),
            channel_id.clone(),
            resolution.chain_id.clone(),
        );
        Ok(resolution)
    }
}

fn lookup<R: TopologyReader + ?Sized>(
    reader: &R,
    origin: &ChainId,
    channel_id: &ChannelId,
    block: &BlockTopology,
) -> Result<Resolution, ProcessorError> {
    let Some(connection_id) = block.connection_of_channel(channel_id) else {
        let context = format!("channel {channel_id}");
        let found = reader
            .chain_id_from_channel_id(origin, channel_id)
            .map_err(|e| ProcessorError::connection(origin, &context, e))?;
        return answered(origin, found, ResolutionTier::ChannelLookup, context);
    };

    let Some(client_id) = block.client_of_connection(connection_id) else {
        let context = format!("channel {channel_id} via connection {connection_id}");
        let found = reader
            .chain_id_from_connection_id(origin, connection_id)
            .map_err(|e| ProcessorError::connection(origin, &context, e))?;
        return answered(origin, found, ResolutionTier::ConnectionLookup, context);
    };

    if let Some(chain_id) = block.chain_of_client(client_id) {
        return Ok(Resolution {
            chain_id: chain_id.clone(),
            tier: ResolutionTier::SameBlock,
        });
    }

    let context = format!("channel {channel_id} via client {client_id}");
    let found = reader
        .chain_id_from_client_id(origin, client_id)
        .map_err(|e| ProcessorError::connection(origin, &context, e))?;
    answered(origin, found, ResolutionTier::ClientLookup, context)
}

fn answered(
    origin: &ChainId,
    found: Option<ChainId>,
    tier: ResolutionTier,
    context: String,
) -> Result<Resolution, ProcessorError> {
    match found {
        Some(chain_id) => Ok(Resolution { chain_id, tier }),
        None => Err(ProcessorError::unresolved(origin, context)),
    }
}
