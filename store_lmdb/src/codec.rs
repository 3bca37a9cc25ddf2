//! Value encoding. Every stored value is bincode.

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::LmdbError;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

/// Read and decode one value inside an open transaction.
///
/// A row that is present but does not decode is reported as corruption,
/// never as a missing row.
pub(crate) fn get_value<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    let Some(bytes) = db.get(txn, key)? else {
        return Ok(None);
    };
    bincode::deserialize(bytes)
        .map(Some)
        .map_err(|e| LmdbError::Corruption {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        })
}
