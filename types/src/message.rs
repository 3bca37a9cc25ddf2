//! Decoded transaction messages.
//!
//! Only the IBC lifecycle and transfer messages carry information the
//! processor acts on; everything else is kept as [`Message::Other`] so it
//! still counts toward volume and active addresses.

use serde::{Deserialize, Serialize};

use crate::{ChainId, ChannelId, ClientId, ConnectionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStep {
    Init,
    Try,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOpenStep {
    Init,
    Try,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelConfirmStep {
    Ack,
    Confirm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCloseStep {
    Init,
    Confirm,
}

/// A token amount. Amounts are decimal strings as chains emit them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// One message of a decoded transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A light client of `chain_id` was created on the reporting chain.
    CreateClient {
        client_id: ClientId,
        chain_id: ChainId,
    },
    OpenConnection {
        step: ConnectionStep,
        connection_id: ConnectionId,
        client_id: ClientId,
    },
    OpenChannel {
        step: ChannelOpenStep,
        channel_id: ChannelId,
        connection_hops: Vec<ConnectionId>,
    },
    ConfirmChannelOpen {
        step: ChannelConfirmStep,
        channel_id: ChannelId,
    },
    ConfirmChannelClose {
        step: ChannelCloseStep,
        channel_id: ChannelId,
    },
    /// Outbound ICS-20 transfer leaving the reporting chain.
    Transfer {
        source_channel: ChannelId,
        sender: String,
        receiver: String,
        token: Coin,
    },
    /// Inbound packet received by the reporting chain.
    Packet {
        sequence: u64,
        source_channel: ChannelId,
        destination_channel: ChannelId,
    },
    /// Any message without IBC topology meaning.
    Other {
        type_url: String,
        #[serde(default)]
        sender: Option<String>,
    },
}

impl Message {
    pub fn is_transfer(&self) -> bool {
        matches!(self, Message::Transfer { .. })
    }

    /// Address that initiated this message, when the message names one.
    pub fn sender(&self) -> Option<&str> {
        match self {
            Message::Transfer { sender, .. } => Some(sender),
            Message::Other { sender, .. } => sender.as_deref(),
            _ => None,
        }
    }

    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CreateClient { .. } => "create_client",
            Message::OpenConnection { .. } => "open_connection",
            Message::OpenChannel { .. } => "open_channel",
            Message::ConfirmChannelOpen { .. } => "confirm_channel_open",
            Message::ConfirmChannelClose { .. } => "confirm_channel_close",
            Message::Transfer { .. } => "transfer",
            Message::Packet { .. } => "packet",
            Message::Other { .. } => "other",
        }
    }
}
