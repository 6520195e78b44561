use ledger_core::Entry;

/// Deterministic total order over one group's entries:
/// ascending `lamport_clock`, then ascending `timestamp`, then lexicographic
/// `creator_device_pubkey`, then lexicographic `entry_id`. Stable under any
/// permutation of the input — replaying the same set of entries in any
/// arrival order always produces the same sequence.
pub fn sort_key(entry: &Entry) -> (u64, i64, [u8; 32], [u8; 32]) {
    (
        entry.lamport_clock,
        entry.timestamp,
        *entry.creator_device_pubkey.as_bytes(),
        *entry.entry_id.as_bytes(),
    )
}

/// Sort `entries` in place into the canonical order.
pub fn order_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

/// Consume `entries` and return them in canonical order.
pub fn ordered(mut entries: Vec<Entry>) -> Vec<Entry> {
    order_entries(&mut entries);
    entries
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::tests::entry as make_entry;
    use super::ordered;

    proptest! {
        /// (P3) For every permutation of a valid chain, `order_entries`
        /// returns the same sequence.
        #[test]
        fn p3_order_is_invariant_under_any_permutation(
            rows in prop::collection::vec((0u64..5, -1000i64..1000, 0u8..250), 1..8),
            seed in any::<u64>(),
        ) {
            let entries: Vec<_> = rows
                .into_iter()
                .enumerate()
                .map(|(id, (lamport, timestamp, device))| make_entry(lamport, timestamp, device, id as u8))
                .collect();

            let forward = ordered(entries.clone());

            let mut shuffled = entries;
            let mut rng = StdRng::seed_from_u64(seed);
            shuffled.shuffle(&mut rng);
            let reordered = ordered(shuffled);

            prop_assert_eq!(
                forward.iter().map(|e| e.entry_id).collect::<Vec<_>>(),
                reordered.iter().map(|e| e.entry_id).collect::<Vec<_>>()
            );
        }
    }
}
