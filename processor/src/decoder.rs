//! Transaction decoding.
//!
//! Chains deliver transactions in their own encoding. The processor only
//! needs the ordered messages and the sender of each accepted transaction,
//! so decoding sits behind [`TxDecoder`]. [`JsonTxDecoder`] handles bodies
//! already normalised to JSON by the upstream watcher.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zonemap_types::{Block, Message, RawTx, Transaction};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("tx {hash}: empty body")]
    EmptyBody { hash: String },

    #[error("tx {hash}: {source}")]
    Json {
        hash: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait TxDecoder {
    fn decode_tx(&self, raw: &RawTx) -> Result<Transaction, DecodeError>;

    /// Decode the accepted transactions of `block`, in block order.
    /// Rejected transactions are skipped without being decoded.
    fn decode_block(&self, block: &Block) -> Result<Vec<Transaction>, DecodeError> {
        block.accepted_txs().map(|tx| self.decode_tx(tx)).collect()
    }
}

/// JSON body of a transaction: `{"sender": "...", "messages": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl TxBody {
    pub fn new(sender: Option<&str>, messages: Vec<Message>) -> Self {
        Self {
            sender: sender.map(str::to_owned),
            messages,
        }
    }

    /// Encode as the bytes [`JsonTxDecoder`] expects.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTxDecoder;

impl TxDecoder for JsonTxDecoder {
    fn decode_tx(&self, raw: &RawTx) -> Result<Transaction, DecodeError> {
        if raw.data.is_empty() {
            return Err(DecodeError::EmptyBody {
                hash: raw.hash.clone(),
            });
        }
        let body: TxBody = serde_json::from_slice(&raw.data).map_err(|source| DecodeError::Json {
            hash: raw.hash.clone(),
            source,
        })?;
        Ok(Transaction {
            hash: raw.hash.clone(),
            sender: body.sender.filter(|s| !s.is_empty()),
            messages: body.messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonemap_types::{ChainId, ChannelId, Coin, Timestamp};

    fn raw(hash: &str, code: u32, data: Vec<u8>) -> RawTx {
        RawTx {
            hash: hash.to_string(),
            result_code: code,
            data,
        }
    }

    fn transfer() -> Message {
        Message::Transfer {
            source_channel: ChannelId::new("channel-0"),
            sender: "addr1".to_string(),
            receiver: "addr2".to_string(),
            token: Coin {
                denom: "uatom".to_string(),
                amount: "5".to_string(),
            },
        }
    }

    #[test]
    fn decodes_json_body() {
        let body = TxBody::new(Some("addr1"), vec![transfer()]);
        let tx = JsonTxDecoder
            .decode_tx(&raw("h1", 0, body.to_bytes().unwrap()))
            .unwrap();
        assert_eq!(tx.hash, "h1");
        assert_eq!(tx.sender.as_deref(), Some("addr1"));
        assert_eq!(tx.messages, vec![transfer()]);
    }

    #[test]
    fn empty_sender_is_dropped() {
        let body = TxBody::new(Some(""), vec![]);
        let tx = JsonTxDecoder
            .decode_tx(&raw("h1", 0, body.to_bytes().unwrap()))
            .unwrap();
        assert_eq!(tx.sender, None);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = JsonTxDecoder
            .decode_tx(&raw("bad", 0, b"not json".to_vec()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref hash, .. } if hash == "bad"));
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let err = JsonTxDecoder.decode_tx(&raw("e", 0, vec![])).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyBody { .. }));
    }

    #[test]
    fn rejected_txs_are_never_decoded() {
        let good = TxBody::new(None, vec![transfer()]).to_bytes().unwrap();
        let block = Block {
            chain_id: ChainId::new("A"),
            height: 1,
            time: Timestamp::new(0),
            txs: vec![raw("ok", 0, good), raw("failed", 11, b"garbage".to_vec())],
        };
        let txs = JsonTxDecoder.decode_block(&block).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "ok");
    }
}
