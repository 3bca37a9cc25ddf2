use proptest::prelude::*;

use zonemap_types::{ChainId, IbcData, Timestamp};

proptest! {
    /// Truncation lands on an hour boundary no later than the input.
    #[test]
    fn truncation_is_hour_aligned(secs in 0u64..u64::MAX) {
        let hour = Timestamp::new(secs).truncate_to_hour();
        prop_assert_eq!(hour.as_secs() % Timestamp::HOUR_SECS, 0);
        prop_assert!(hour.as_secs() <= secs);
        prop_assert!(secs - hour.as_secs() < Timestamp::HOUR_SECS);
    }

    /// Truncation is idempotent.
    #[test]
    fn truncation_is_idempotent(secs in 0u64..u64::MAX) {
        let once = Timestamp::new(secs).truncate_to_hour();
        prop_assert_eq!(once.truncate_to_hour(), once);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp bincode serialization roundtrip.
    #[test]
    fn timestamp_bincode_roundtrip(secs in 0u64..u64::MAX) {
        let ts = Timestamp::new(secs);
        let encoded = bincode::serialize(&ts).unwrap();
        let decoded: Timestamp = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, ts);
    }

    /// Every append is accounted for exactly once, whatever the key collisions.
    #[test]
    fn ibc_data_total_equals_appends(
        transfers in prop::collection::vec((0u8..3, 0u8..3, 0u64..4 * 3600), 0..64)
    ) {
        let mut data = IbcData::new();
        for (src, dst, secs) in &transfers {
            data.append(
                &ChainId::new(format!("zone-{src}")),
                &ChainId::new(format!("zone-{dst}")),
                Timestamp::new(*secs),
            );
        }
        let rows = data.to_ibc_stats();
        let total: u64 = rows.iter().map(|r| r.count).sum();
        prop_assert_eq!(total, transfers.len() as u64);
        prop_assert_eq!(rows.len(), data.len());
        prop_assert!(rows.iter().all(|r| r.count >= 1));
    }

    /// Leaves are unique per (source, destination, hour).
    #[test]
    fn ibc_data_leaves_are_unique(
        transfers in prop::collection::vec((0u8..3, 0u8..3, 0u64..4 * 3600), 0..64)
    ) {
        let mut data = IbcData::new();
        for (src, dst, secs) in &transfers {
            data.append(
                &ChainId::new(format!("zone-{src}")),
                &ChainId::new(format!("zone-{dst}")),
                Timestamp::new(*secs),
            );
        }
        let rows = data.to_ibc_stats();
        let mut keys: Vec<_> = rows
            .iter()
            .map(|r| (r.source.clone(), r.destination.clone(), r.hour))
            .collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), rows.len());
    }
}
