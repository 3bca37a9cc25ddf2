//! Fundamental types for the zonemap block processor.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! chain and IBC identifiers, timestamps with hour bucketing, blocks as they
//! arrive from a chain, decoded messages, and the statistics rows produced
//! from them.

pub mod block;
pub mod error;
pub mod ids;
pub mod message;
pub mod stats;
pub mod time;

pub use block::{Block, RawTx, Transaction};
pub use error::TypesError;
pub use ids::{ChainId, ChannelId, ClientId, ConnectionId};
pub use message::{
    ChannelCloseStep, ChannelConfirmStep, ChannelOpenStep, Coin, ConnectionStep, Message,
};
pub use stats::{IbcData, IbcStats, TxStats};
pub use time::{Clock, SystemClock, Timestamp};
