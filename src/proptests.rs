use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashSet;

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Insert(u16),
    Lookup(u16),
}

fn capacity_strategy() -> impl Strategy<Value = usize> {
    (0u32..=10).prop_map(|shift| 1usize << shift)
}

/// Every stored fingerprint must sit in a candidate bucket of some key that
/// was inserted with that fingerprint.
fn validate_filter<R>(f: &CuckooFilter<R>, keys: &HashSet<Key>) {
    let capacity = f.capacity();
    for (index, fp) in f.iter() {
        if fp == EMPTY {
            continue;
        }
        let alt = hash::alternate_index(index, fp, capacity);
        assert_eq!(hash::alternate_index(alt, fp, capacity), index);
        let owned = keys.iter().any(|&k| {
            let c = Candidates::for_key(k, capacity);
            c.fingerprint == fp && (c.index1 == index || c.index2 == index)
        });
        assert!(owned, "slot {index} holds {fp:04x} that no inserted key owns");
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_no_false_negatives(
        capacity in capacity_strategy(),
        seed in any::<u64>(),
        ops in prop::collection::vec(any::<Op>(), 0..=400),
    ) {
        let mut f = CuckooFilter::seeded(capacity, seed).unwrap();
        let mut inserted: HashSet<Key> = HashSet::new();
        let mut live: Vec<Key> = Vec::new();
        let mut dropped: Vec<Fingerprint> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    let mut journal = Journal::new();
                    let res = f.insert_observed(key, &mut journal);
                    prop_assert!(journal.slot_writes() <= MAX_RELOCATIONS + 2);
                    inserted.insert(key);
                    match res {
                        Ok(_) => live.push(key),
                        Err(Error::InsertOverflow { dropped: fp, .. }) => dropped.push(fp),
                        Err(e) => prop_assert!(false, "unexpected error {}", e),
                    }
                }
                Op::Lookup(key) => {
                    let first = f.lookup(key);
                    prop_assert_eq!(first, f.lookup(key));
                }
            }
        }

        validate_filter(&f, &inserted);
        for key in live {
            if !dropped.contains(&hash::fingerprint(key)) {
                prop_assert!(f.lookup(key), "key {} lost", key);
            }
        }
        prop_assert!(f.len() <= capacity);
    }

    #[test]
    fn prop_index_symmetry(key in any::<u16>(), capacity in capacity_strategy()) {
        let c = Candidates::for_key(key, capacity);
        prop_assert_eq!(hash::alternate_index(c.index1, c.fingerprint, capacity), c.index2);
        prop_assert_eq!(hash::alternate_index(c.index2, c.fingerprint, capacity), c.index1);
        prop_assert!(c.index1 < capacity && c.index2 < capacity);
    }

    #[test]
    fn prop_rollback_is_exact(
        seed in any::<u64>(),
        keys in prop::collection::vec(any::<u16>(), 1..=64),
    ) {
        let mut f = CuckooFilter::seeded(16, seed).unwrap();
        let mut all = Journal::new();
        for key in keys {
            let _ = f.insert_observed(key, &mut all);
        }
        prop_assert!(all.steps().iter().any(|s| s.phase == Phase::InsertUpdate));
        all.rollback(&mut f).unwrap();
        prop_assert!(f.is_empty());
    }
}
