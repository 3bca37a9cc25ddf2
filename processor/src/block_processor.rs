//! Block processing pipeline.
//!
//! Per block: suppression check, height check, decode, message dispatch
//! (topology records, channel resolution, transfer counting), hourly volume,
//! and one atomic commit. The pipeline itself is sync to keep reasoning
//! simple; only [`BlockProcessor::run`] awaits, between blocks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use zonemap_store::PersistenceGateway;
use zonemap_types::{Block, ChainId, Clock, Message, SystemClock, Timestamp, TxStats};

use crate::accumulator::StatsAccumulator;
use crate::decoder::{JsonTxDecoder, TxDecoder};
use crate::error::{ErrorKind, ProcessorError};
use crate::metrics::ProcessorMetrics;
use crate::resolver::{Resolution, TopologyResolver};
use crate::shutdown::ShutdownReason;
use crate::tracing_spans;

/// What happened to a block that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block's batch was committed; `height` is now the chain's last processed block.
    Committed { height: u64 },
    /// The chain is suppressed; the block was ignored without side effects.
    SkippedSuppressed,
}

/// Per-chain lifecycle: `Unknown → Tracked → Suppressed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    /// No block of this chain was seen by this process.
    Unknown,
    /// Last committed height is cached.
    Tracked(u64),
    /// A decode or height error stopped this chain until restart.
    Suppressed,
}

pub struct BlockProcessor<G, D = JsonTxDecoder> {
    gateway: Arc<G>,
    decoder: D,
    clock: Arc<dyn Clock + Send + Sync>,
    heights: HashMap<ChainId, u64>,
    suppressed: HashSet<ChainId>,
    accumulator: StatsAccumulator,
    resolver: TopologyResolver,
    metrics: Option<Arc<ProcessorMetrics>>,
}

impl<G, D> BlockProcessor<G, D>
where
    G: PersistenceGateway,
    D: TxDecoder,
{
    pub fn new(gateway: Arc<G>, decoder: D) -> Self {
        Self {
            gateway,
            decoder,
            clock: Arc::new(SystemClock),
            heights: HashMap::new(),
            suppressed: HashSet::new(),
            accumulator: StatsAccumulator::new(),
            resolver: TopologyResolver::new(),
            metrics: None,
        }
    }

    /// Clock stamping `last_updated_at` of committed blocks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ProcessorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn chain_state(&self, chain_id: &ChainId) -> ChainState {
        if self.suppressed.contains(chain_id) {
            ChainState::Suppressed
        } else if let Some(height) = self.heights.get(chain_id) {
            ChainState::Tracked(*height)
        } else {
            ChainState::Unknown
        }
    }

    pub fn is_suppressed(&self, chain_id: &ChainId) -> bool {
        self.suppressed.contains(chain_id)
    }

    pub fn resolver(&self) -> &TopologyResolver {
        &self.resolver
    }

    /// Drive one block to a commit or to a classified failure.
    ///
    /// `Decode` and `BlockHeight` failures suppress the chain before
    /// returning. Nothing of a failed block is persisted and the height
    /// cache only advances after a successful commit.
    pub fn handle_block(&mut self, block: &Block) -> Result<BlockOutcome, ProcessorError> {
        let span = tracing_spans::block_span(block.chain_id.as_str(), block.height);
        let _guard = span.enter();

        if self.suppressed.contains(&block.chain_id) {
            tracing::trace!("chain suppressed, block skipped");
            if let Some(m) = &self.metrics {
                m.blocks_skipped.inc();
            }
            return Ok(BlockOutcome::SkippedSuppressed);
        }

        let started = Instant::now();
        let result = block
            .validate()
            .map_err(|e| ProcessorError::invalid(e.to_string()).with_source(e))
            .and_then(|()| self.process(block));

        match result {
            Ok(height) => {
                self.heights.insert(block.chain_id.clone(), height);
                if let Some(m) = &self.metrics {
                    m.blocks_committed.inc();
                    m.block_process_time_ms
                        .observe(started.elapsed().as_secs_f64() * 1000.0);
                }
                tracing::debug!("block committed");
                Ok(BlockOutcome::Committed { height })
            }
            Err(err) => {
                if let Some(m) = &self.metrics {
                    m.blocks_failed
                        .with_label_values(&[err.kind().as_str()])
                        .inc();
                }
                if err.kind().suppresses_chain() {
                    self.suppress(&block.chain_id, &err);
                }
                Err(err)
            }
        }
    }

    /// Process blocks until shutdown, a closed source, or a fatal error.
    ///
    /// Shutdown is checked first on every iteration; a block already taken
    /// from the source always runs to completion. If the shutdown sender is
    /// dropped without sending, the loop keeps going on blocks alone.
    pub async fn run(
        &mut self,
        mut blocks: mpsc::Receiver<Block>,
        mut shutdown: broadcast::Receiver<ShutdownReason>,
    ) -> Result<(), ProcessorError> {
        tracing::info!("block processor started");
        let mut listening = true;
        loop {
            let block = tokio::select! {
                biased;
                received = shutdown.recv(), if listening => {
                    let reason = match received {
                        Ok(reason) => reason,
                        Err(broadcast::error::RecvError::Lagged(_)) => ShutdownReason::Requested,
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!("shutdown sender dropped, no longer listening");
                            listening = false;
                            continue;
                        }
                    };
                    tracing::info!(%reason, "block processor shutting down");
                    return Ok(());
                }
                block = blocks.recv() => match block {
                    Some(block) => block,
                    None => {
                        tracing::error!("block source closed");
                        return Err(ProcessorError::source_closed());
                    }
                },
            };

            match self.handle_block(&block) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => {
                    tracing::error!(
                        chain = %block.chain_id,
                        height = block.height,
                        error = %err,
                        "fatal error, stopping block processor"
                    );
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        chain = %block.chain_id,
                        height = block.height,
                        error = %err,
                        "block rejected"
                    );
                }
            }
        }
    }

    fn process(&mut self, block: &Block) -> Result<u64, ProcessorError> {
        let chain_id = &block.chain_id;

        let last = self.last_processed(chain_id)?;
        let expected = last.saturating_add(1);
        if block.height != expected {
            return Err(ProcessorError::block_height(chain_id, expected, block.height));
        }

        self.accumulator.reset(chain_id.clone());
        self.accumulator.add_zone();
        self.accumulator.mark_block(self.clock.now());

        let txs = self
            .decoder
            .decode_block(block)
            .map_err(|e| ProcessorError::decode(chain_id, e))?;

        let mut tx_stats = TxStats::new(chain_id.clone(), block.time);
        for tx in &txs {
            for message in &tx.messages {
                self.apply_message(chain_id, block.time, message)?;
                if let Some(sender) = message.sender() {
                    tx_stats.add_address(sender);
                }
            }
            if let Some(sender) = &tx.sender {
                tx_stats.add_address(sender);
            }
            tx_stats.record_tx(tx.has_ibc_transfer());
        }
        self.accumulator.add_tx_stats(tx_stats);

        let batch = self.accumulator.take_batch();
        self.gateway
            .commit(&batch)
            .map_err(|e| ProcessorError::commit(chain_id, e))?;
        tracing::trace!(txs = txs.len(), mutations = batch.len(), "batch applied");
        Ok(block.height)
    }

    /// Last committed height, from the cache or (once per chain) the gateway.
    fn last_processed(&mut self, chain_id: &ChainId) -> Result<u64, ProcessorError> {
        if let Some(height) = self.heights.get(chain_id) {
            return Ok(*height);
        }
        let height = self
            .gateway
            .last_processed_block(chain_id)
            .map_err(|e| ProcessorError::connection(chain_id, "last processed block", e))?;
        self.heights.insert(chain_id.clone(), height);
        Ok(height)
    }

    fn apply_message(
        &mut self,
        origin: &ChainId,
        time: Timestamp,
        message: &Message,
    ) -> Result<(), ProcessorError> {
        match message {
            Message::CreateClient {
                client_id,
                chain_id,
            } => {
                self.accumulator.add_client(client_id.clone(), chain_id.clone());
            }
            Message::OpenConnection {
                connection_id,
                client_id,
                ..
            } => {
                self.accumulator
                    .add_connection(connection_id.clone(), client_id.clone());
            }
            Message::OpenChannel {
                channel_id,
                connection_hops,
                ..
            } => {
                let Some(connection_id) = connection_hops.first() else {
                    return Err(ProcessorError::new(
                        ErrorKind::Decode,
                        format!("channel {channel_id} opened without connection hops"),
                    )
                    .with_chain(origin));
                };
                self.accumulator
                    .add_channel(channel_id.clone(), connection_id.clone());
            }
            Message::ConfirmChannelOpen { channel_id, .. } => {
                self.accumulator.set_channel_state(channel_id.clone(), true);
            }
            Message::ConfirmChannelClose { channel_id, .. } => {
                self.accumulator.set_channel_state(channel_id.clone(), false);
            }
            Message::Transfer { source_channel, .. } => {
                let resolution = self.resolver.resolve(
                    &*self.gateway,
                    origin,
                    source_channel,
                    self.accumulator.topology(),
                )?;
                self.record_resolution(&resolution);
                self.accumulator
                    .add_ibc_transfer(origin, &resolution.chain_id, time);
            }
            Message::Packet {
                destination_channel,
                ..
            } => {
                let resolution = self.resolver.resolve(
                    &*self.gateway,
                    origin,
                    destination_channel,
                    self.accumulator.topology(),
                )?;
                self.record_resolution(&resolution);
                self.accumulator
                    .add_ibc_transfer(&resolution.chain_id, origin, time);
            }
            Message::Other { .. } => {}
        }
        Ok(())
    }

    fn record_resolution(&self, resolution: &Resolution) {
        if let Some(m) = &self.metrics {
            m.ibc_transfers.inc();
            m.channel_resolutions
                .with_label_values(&[resolution.tier.as_str()])
                .inc();
            if resolution.tier.used_gateway() {
                m.gateway_lookups.inc();
            }
        }
    }

    fn suppress(&mut self, chain_id: &ChainId, err: &ProcessorError) {
        if self.suppressed.insert(chain_id.clone()) {
            tracing::warn!(chain = %chain_id, error = %err, "chain suppressed until restart");
            if let Some(m) = &self.metrics {
                m.suppressed_chains.set(self.suppressed.len() as i64);
            }
        }
    }
}
