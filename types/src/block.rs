//! Blocks as delivered by a chain, and transactions decoded from them.

use serde::{Deserialize, Serialize};

use crate::{ChainId, Message, Timestamp, TypesError};

/// One block of one zone, as delivered by the block source.
///
/// Transactions stay in their encoded form until the processor decodes
/// them; only accepted transactions (`result_code == 0`) are decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub chain_id: ChainId,
    pub height: u64,
    pub time: Timestamp,
    #[serde(default)]
    pub txs: Vec<RawTx>,
}

impl Block {
    /// Reject blocks that can never be applied to any chain.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.chain_id.is_empty() {
            return Err(TypesError::EmptyChainId);
        }
        if self.height == 0 {
            return Err(TypesError::InvalidHeight(self.height));
        }
        Ok(())
    }

    /// Transactions the chain executed successfully, in block order.
    pub fn accepted_txs(&self) -> impl Iterator<Item = &RawTx> {
        self.txs.iter().filter(|tx| tx.is_accepted())
    }
}

/// An encoded transaction with its execution result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    pub hash: String,
    #[serde(default)]
    pub result_code: u32,
    /// Encoded transaction body. Hex on the wire.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl RawTx {
    pub fn is_accepted(&self) -> bool {
        self.result_code == 0
    }
}

/// A decoded, accepted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    /// Fee payer / first signer, counted as an active address.
    pub sender: Option<String>,
    pub messages: Vec<Message>,
}

impl Transaction {
    /// Whether any message in this transaction is an outbound IBC transfer.
    pub fn has_ibc_transfer(&self) -> bool {
        self.messages.iter().any(Message::is_transfer)
    }
}

mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| D::Error::custom(crate::TypesError::InvalidHex(e.to_string())))
    }
}
