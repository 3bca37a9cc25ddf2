//! Zonemap block processor.
//!
//! Consumes blocks from many chains and turns each into one atomic commit:
//! - Enforces strict per-chain height ordering and suppresses broken chains
//! - Records IBC clients, connections and channels as they are created
//! - Resolves transfer channels to counterparty zones (same block, then store)
//! - Aggregates hourly transaction volume, active addresses and IBC transfers

pub mod accumulator;
pub mod block_processor;
pub mod config;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod resolver;
pub mod shutdown;
pub mod tracing_spans;

pub use accumulator::{BlockTopology, StatsAccumulator};
pub use block_processor::{BlockOutcome, BlockProcessor, ChainState};
pub use config::{ConfigError, ProcessorConfig};
pub use decoder::{DecodeError, JsonTxDecoder, TxBody, TxDecoder};
pub use error::{ErrorKind, ProcessorError};
pub use logging::{init_logging, LogFormat};
pub use metrics::ProcessorMetrics;
pub use resolver::{ChannelCache, Resolution, ResolutionTier, TopologyResolver};
pub use shutdown::{ShutdownController, ShutdownReason};
