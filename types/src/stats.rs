//! Hourly statistics rows and the in-memory IBC transfer map.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{ChainId, Timestamp};

/// Transaction volume of one zone during one hour.
///
/// Rows with the same `(chain_id, hour)` merge by adding counts and
/// taking the union of addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStats {
    pub chain_id: ChainId,
    pub hour: Timestamp,
    pub count: u64,
    pub txs_with_ibc_transfer: u64,
    pub addresses: BTreeSet<String>,
}

impl TxStats {
    /// Empty stats for the hour containing `time`.
    pub fn new(chain_id: ChainId, time: Timestamp) -> Self {
        Self {
            chain_id,
            hour: time.truncate_to_hour(),
            ..Default::default()
        }
    }

    /// Count one accepted transaction.
    pub fn record_tx(&mut self, has_ibc_transfer: bool) {
        self.count += 1;
        if has_ibc_transfer {
            self.txs_with_ibc_transfer += 1;
        }
    }

    pub fn add_address(&mut self, address: &str) {
        if !address.is_empty() && !self.addresses.contains(address) {
            self.addresses.insert(address.to_owned());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Transfers from `source` to `destination` during one hour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcStats {
    pub source: ChainId,
    pub destination: ChainId,
    pub hour: Timestamp,
    pub count: u64,
}

/// `source -> destination -> hour -> count`.
///
/// Every stored count is at least 1; a missing key means zero. Repeated
/// appends for the same key coalesce into one leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IbcData(BTreeMap<ChainId, BTreeMap<ChainId, BTreeMap<Timestamp, u64>>>);

impl IbcData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one transfer, bucketed to the hour containing `time`.
    pub fn append(&mut self, source: &ChainId, destination: &ChainId, time: Timestamp) {
        *self
            .0
            .entry(source.clone())
            .or_default()
            .entry(destination.clone())
            .or_default()
            .entry(time.truncate_to_hour())
            .or_default() += 1;
    }

    /// Count for one key, zero when absent.
    pub fn get(&self, source: &ChainId, destination: &ChainId, hour: Timestamp) -> u64 {
        self.0
            .get(source)
            .and_then(|d| d.get(destination))
            .and_then(|h| h.get(&hour.truncate_to_hour()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct `(source, destination, hour)` leaves.
    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|d| d.values())
            .map(|h| h.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One row per leaf, in key order.
    pub fn to_ibc_stats(&self) -> Vec<IbcStats> {
        let mut stats = Vec::with_capacity(self.len());
        for (source, destinations) in &self.0 {
            for (destination, hours) in destinations {
                for (hour, count) in hours {
                    stats.push(IbcStats {
                        source: source.clone(),
                        destination: destination.clone(),
                        hour: *hour,
                        count: *count,
                    });
                }
            }
        }
        stats
    }
}
