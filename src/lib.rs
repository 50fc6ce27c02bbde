//! # cuckoo-rs
//!
//! A fixed-capacity cuckoo filter for 16-bit keys.
//!
//! Each bucket holds a single 16-bit fingerprint. A key may live in one of
//! two buckets: `index1 = hash(key) & mask` and
//! `index2 = index1 ^ (hash(fingerprint) & mask)`. When both are taken the
//! new fingerprint evicts one of them and the victim is moved to its own
//! alternate bucket, up to [`MAX_RELOCATIONS`] times.
//!
//! Every slot write is performed as a checkpointed [`Step`] that records the
//! old and new value, so an external recovery layer can undo or redo an
//! interrupted insert. See the [`step`] module.
//!
//! ## Example
//!
//! ```rust
//! use cuckoo_rs::CuckooFilter;
//!
//! let mut filter = CuckooFilter::seeded(32, 7).unwrap();
//! assert!(filter.insert(34));
//! assert!(filter.lookup(34));
//! assert_eq!(filter.len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod harness;
pub mod hash;
pub mod keys;
pub mod report;
pub mod step;

mod buckets;

pub use buckets::{BucketStore, MAX_CAPACITY};
pub use error::{Error, Result};
pub use hash::Candidates;
pub use keys::KeyGenerator;
pub use report::{RunStats, Snapshot};
pub use step::{Journal, Phase, SlotWrite, Step, StepObserver};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Key = u16;
pub type Fingerprint = u16;

/// Slot value meaning "no fingerprint stored".
pub const EMPTY: Fingerprint = 0;

/// Longest relocation chain an insert will follow before giving up.
pub const MAX_RELOCATIONS: usize = 5;

// =============================================================================
// Insert outcome
// =============================================================================

/// Successful insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    /// Slot the new fingerprint was first written to. A relocation chain
    /// that wraps back around may later move it to its alternate slot.
    pub placed_at: usize,
    /// Number of displaced fingerprints moved. Zero when a candidate slot
    /// was free.
    pub relocations: usize,
}

enum Placement {
    Placed(usize),
    Evicted { index: usize, victim: Fingerprint },
}

// =============================================================================
// CuckooFilter
// =============================================================================

/// Single-slot-bucket cuckoo filter over a power-of-two bucket array.
///
/// `R` supplies the coin flip used to pick an eviction victim. Any uniform
/// source works; [`StdRng`] is the default.
#[derive(Clone)]
pub struct CuckooFilter<R = StdRng> {
    store: BucketStore,
    rng: R,
}

impl CuckooFilter<StdRng> {
    /// Filter with an entropy-seeded RNG.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Filter whose eviction choices are reproducible from `seed`.
    pub fn seeded(capacity: usize, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }
}

impl<R> CuckooFilter<R> {
    /// Fails with [`Error::CapacityMisconfiguration`] unless `capacity` is a
    /// power of two no larger than [`MAX_CAPACITY`].
    pub fn with_rng(capacity: usize, rng: R) -> Result<Self> {
        Ok(Self {
            store: BucketStore::new(capacity)?,
            rng,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.store.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Read-only view of the slots in index order.
    #[inline]
    pub fn slots(&self) -> &[Fingerprint] {
        self.store.as_slice()
    }

    #[inline]
    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// `(index, fingerprint)` for every slot, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Fingerprint)> + '_ {
        self.slots().iter().copied().enumerate()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.slots())
    }

    pub fn candidates(&self, key: Key) -> Candidates {
        Candidates::for_key(key, self.capacity())
    }

    pub fn lookup(&self, key: Key) -> bool {
        self.lookup_observed(key, &mut ())
    }

    #[inline]
    pub fn contains(&self, key: Key) -> bool {
        self.lookup(key)
    }

    /// [`lookup`](Self::lookup), reporting each phase to `observer`.
    pub fn lookup_observed<O: StepObserver + ?Sized>(&self, key: Key, observer: &mut O) -> bool {
        let capacity = self.capacity();

        observer.on_phase(Phase::LookupFingerprint);
        let fp = hash::fingerprint(key);

        observer.on_phase(Phase::LookupIndex1);
        let index1 = hash::index_from_key(key, capacity);

        observer.on_phase(Phase::LookupIndex2);
        let index2 = hash::alternate_index(index1, fp, capacity);

        observer.on_phase(Phase::LookupCheck);
        self.store.get(index1) == Some(fp) || self.store.get(index2) == Some(fp)
    }

    /// Undo one step previously produced by this filter.
    pub fn revert(&mut self, step: &Step) -> Result<()> {
        self.store.revert(step)
    }

    /// Redo one step previously produced by this filter.
    pub fn reapply(&mut self, step: &Step) -> Result<()> {
        self.store.reapply(step)
    }
}

impl<R: Rng> CuckooFilter<R> {
    /// Insert `key`, returning `false` if the relocation chain overflowed.
    ///
    /// A `false` return means some fingerprint (possibly one belonging to an
    /// earlier key) has been dropped from the filter.
    pub fn insert(&mut self, key: Key) -> bool {
        self.try_insert(key).is_ok()
    }

    pub fn try_insert(&mut self, key: Key) -> Result<Insertion> {
        self.insert_observed(key, &mut ())
    }

    /// Insert `key`, reporting every phase marker and every slot write to
    /// `observer`.
    ///
    /// At most `MAX_RELOCATIONS + 2` slot writes are reported: two for the
    /// initial placement and one per relocation.
    pub fn insert_observed<O: StepObserver + ?Sized>(
        &mut self,
        key: Key,
        observer: &mut O,
    ) -> Result<Insertion> {
        let capacity = self.capacity();

        observer.on_phase(Phase::InsertFingerprint);
        let fp = hash::fingerprint(key);

        observer.on_phase(Phase::InsertIndex1);
        let index1 = hash::index_from_key(key, capacity);

        observer.on_phase(Phase::InsertIndex2);
        let index2 = hash::alternate_index(index1, fp, capacity);

        observer.on_phase(Phase::InsertUpdate);
        let (step, placement) = self.place(Candidates {
            fingerprint: fp,
            index1,
            index2,
        });
        observer.on_step(&step);

        let (placed_at, mut victim) = match placement {
            Placement::Placed(index) => {
                return Ok(Insertion {
                    placed_at: index,
                    relocations: 0,
                })
            }
            Placement::Evicted { index, victim } => (index, victim),
        };

        let mut victim_index = placed_at;
        let mut relocations = 0;
        loop {
            observer.on_phase(Phase::RelocateVictim);
            victim_index = hash::alternate_index(victim_index, victim, capacity);

            observer.on_phase(Phase::RelocateUpdate);
            let (step, next) = self.store.step(
                Phase::RelocateUpdate,
                [victim_index],
                |[slot]: &mut [Fingerprint; 1]| std::mem::replace(slot, victim),
            );
            observer.on_step(&step);
            relocations += 1;

            if next == EMPTY {
                return Ok(Insertion {
                    placed_at,
                    relocations,
                });
            }
            victim = next;
            if relocations >= MAX_RELOCATIONS {
                return Err(Error::InsertOverflow {
                    key,
                    dropped: victim,
                });
            }
        }
    }

    /// Put `fp` into a free candidate slot, or evict one of the two at random.
    fn place(&mut self, candidates: Candidates) -> (Step, Placement) {
        let Candidates {
            fingerprint: fp,
            index1,
            index2,
        } = candidates;
        let rng = &mut self.rng;

        if candidates.is_degenerate() {
            return self.store.step(
                Phase::InsertUpdate,
                [index1],
                |[slot]: &mut [Fingerprint; 1]| {
                    if *slot == EMPTY {
                        *slot = fp;
                        Placement::Placed(index1)
                    } else {
                        Placement::Evicted {
                            index: index1,
                            victim: std::mem::replace(slot, fp),
                        }
                    }
                },
            );
        }

        self.store.step(
            Phase::InsertUpdate,
            [index1, index2],
            |[slot1, slot2]: &mut [Fingerprint; 2]| {
                if *slot1 == EMPTY {
                    *slot1 = fp;
                    Placement::Placed(index1)
                } else if *slot2 == EMPTY {
                    *slot2 = fp;
                    Placement::Placed(index2)
                } else if rng.gen::<bool>() {
                    Placement::Evicted {
                        index: index1,
                        victim: std::mem::replace(slot1, fp),
                    }
                } else {
                    Placement::Evicted {
                        index: index2,
                        victim: std::mem::replace(slot2, fp),
                    }
                }
            },
        )
    }
}

impl<R> std::fmt::Debug for CuckooFilter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(n: usize) -> Vec<Key> {
        KeyGenerator::default().take(n).collect()
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        for capacity in [0usize, 3, 12, 33, 1000] {
            assert_eq!(
                CuckooFilter::seeded(capacity, 0).unwrap_err(),
                Error::CapacityMisconfiguration { capacity }
            );
        }
        assert!(CuckooFilter::new(MAX_CAPACITY).is_ok());
        assert!(CuckooFilter::new(MAX_CAPACITY * 2).is_err());
    }

    #[test]
    fn test_empty_filter_lookup() {
        let filter = CuckooFilter::seeded(32, 1).unwrap();
        assert!(filter.is_empty());
        for key in 0..=u16::MAX {
            assert!(!filter.lookup(key));
        }
    }

    #[test]
    fn test_free_slots_fill_deterministically() {
        // The first seven keys of the harness sequence never need an
        // eviction in a 32-bucket filter.
        let mut filter = CuckooFilter::seeded(32, 0).unwrap();
        let expected = [7usize, 26, 0, 10, 8, 31, 28];
        for (key, want) in sequence(7).into_iter().zip(expected) {
            let ins = filter.try_insert(key).unwrap();
            assert_eq!(ins.placed_at, want, "key {key}");
            assert_eq!(ins.relocations, 0);
            assert_eq!(filter.slots()[want], hash::fingerprint(key));
        }
        assert_eq!(filter.len(), 7);
        // 44870 collided with 595 at index 26 and went to its alternate.
        assert_eq!(filter.candidates(44870).index1, 26);
    }

    #[test]
    fn test_capacity_32_with_24_keys() {
        for seed in 0..64 {
            let mut filter = CuckooFilter::seeded(32, seed).unwrap();
            let mut succeeded = Vec::new();
            let mut dropped = Vec::new();
            for key in sequence(24) {
                match filter.try_insert(key) {
                    Ok(_) => succeeded.push(key),
                    Err(Error::InsertOverflow { dropped: fp, .. }) => dropped.push(fp),
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            assert!(succeeded.len() >= 20, "seed {seed}: {}", succeeded.len());
            for key in succeeded {
                if !dropped.contains(&hash::fingerprint(key)) {
                    assert!(filter.lookup(key), "seed {seed}: key {key} missing");
                }
            }
        }
    }

    #[test]
    fn test_overflow_on_tiny_filter() {
        let mut filter = CuckooFilter::seeded(4, 3).unwrap();
        let results: Vec<bool> = sequence(20).into_iter().map(|k| filter.insert(k)).collect();
        assert!(results.iter().any(|ok| !ok));
        assert_eq!(filter.len(), 4);
    }

    #[test]
    fn test_single_bucket_chain_is_bounded() {
        // With one bucket both candidates coincide, so the second key evicts
        // the first and the chain ping-pongs until it gives up.
        let mut filter = CuckooFilter::seeded(1, 0).unwrap();
        let a = 34;
        let b = 595;
        assert_eq!(filter.try_insert(a).unwrap().placed_at, 0);

        let mut journal = Journal::new();
        let err = filter.insert_observed(b, &mut journal).unwrap_err();
        assert_eq!(
            err,
            Error::InsertOverflow {
                key: b,
                dropped: hash::fingerprint(b)
            }
        );
        assert_eq!(filter.slots(), &[hash::fingerprint(a)]);
        assert_eq!(journal.len(), 1 + MAX_RELOCATIONS);
        assert!(journal.slot_writes() <= MAX_RELOCATIONS + 2);
        assert_eq!(journal.phase(), Some(Phase::RelocateUpdate));
    }

    #[test]
    fn test_slot_writes_are_bounded() {
        let mut filter = CuckooFilter::seeded(8, 11).unwrap();
        let mut journal = Journal::new();
        for key in sequence(40) {
            journal.clear();
            let _ = filter.insert_observed(key, &mut journal);
            assert!(journal.slot_writes() <= MAX_RELOCATIONS + 2);
            assert!(journal.steps().iter().all(|s| s.phase.is_mutating()));
        }
    }

    #[test]
    fn test_rollback_restores_prior_state() {
        let mut filter = CuckooFilter::seeded(8, 5).unwrap();
        let mut journal = Journal::new();
        for key in sequence(12) {
            let before = filter.slots().to_vec();
            journal.clear();
            let _ = filter.insert_observed(key, &mut journal);
            let after = filter.slots().to_vec();

            journal.replay(&mut filter).unwrap();
            assert_eq!(filter.slots(), after.as_slice());

            let mut undo = journal.clone();
            undo.rollback(&mut filter).unwrap();
            assert_eq!(filter.slots(), before.as_slice());
            assert!(undo.is_empty());

            journal.replay(&mut filter).unwrap();
            assert_eq!(filter.slots(), after.as_slice());
        }
    }

    #[test]
    fn test_eviction_choice_is_unbiased() {
        // Both slots of a 2-bucket filter stay full, so every placement
        // evicts and the coin decides which candidate is taken.
        let candidates = Candidates {
            fingerprint: 0xbeef,
            index1: 0,
            index2: 1,
        };
        let draws = 2000;
        let mut total_first = 0;
        for seed in 0..16 {
            let mut filter = CuckooFilter::seeded(2, seed).unwrap();
            filter.place(Candidates { fingerprint: 0x1111, ..candidates });
            filter.place(Candidates { fingerprint: 0x2222, ..candidates });
            assert_eq!(filter.len(), 2);

            let mut first = 0;
            for _ in 0..draws {
                match filter.place(candidates).1 {
                    Placement::Evicted { index: 0, .. } => first += 1,
                    Placement::Evicted { index: 1, .. } => {}
                    _ => panic!("full filter must evict"),
                }
            }
            assert!(
                (draws * 2 / 5..=draws * 3 / 5).contains(&first),
                "seed {seed}: {first} of {draws} evictions hit index1"
            );
            total_first += first;
        }
        let total = 16 * draws;
        assert!(
            (total * 47 / 100..=total * 53 / 100).contains(&total_first),
            "{total_first} of {total} evictions hit index1"
        );
    }

    #[test]
    fn test_evicting_inserts_use_both_candidates() {
        let mut filter = CuckooFilter::seeded(32, 17).unwrap();
        let mut hit = [false; 2];
        for key in sequence(400) {
            let c = filter.candidates(key);
            let mut journal = Journal::new();
            let res = filter.insert_observed(key, &mut journal);
            if c.is_degenerate() || journal.len() == 1 {
                continue;
            }
            // The placement step records index1 then index2; the evicted one
            // is the slot that now holds the new fingerprint.
            let placement = &journal.steps()[0];
            let evicted = placement
                .writes
                .iter()
                .position(|w| w.new == c.fingerprint && w.old != c.fingerprint);
            if let Some(i) = evicted {
                hit[i] = true;
                if let Ok(ins) = res {
                    assert_eq!(ins.placed_at, placement.writes[i].index);
                }
            }
        }
        assert_eq!(hit, [true, true]);
    }

    #[test]
    fn test_lookup_phases() {
        let mut filter = CuckooFilter::seeded(32, 0).unwrap();
        filter.insert(34);

        let mut journal = Journal::new();
        assert!(filter.lookup_observed(34, &mut journal));
        assert_eq!(journal.phase(), Some(Phase::LookupCheck));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut filter = CuckooFilter::seeded(16, 9).unwrap();
        for key in sequence(10) {
            filter.insert(key);
        }
        let first: Vec<bool> = (0..2000u16).map(|k| filter.lookup(k)).collect();
        let second: Vec<bool> = (0..2000u16).map(|k| filter.lookup(k)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seeded_filters_agree() {
        let mut a = CuckooFilter::seeded(8, 42).unwrap();
        let mut b = CuckooFilter::seeded(8, 42).unwrap();
        for key in sequence(30) {
            assert_eq!(a.try_insert(key), b.try_insert(key));
        }
        assert_eq!(a.slots(), b.slots());
    }

    #[test]
    fn test_iter_and_load_factor() {
        let mut filter = CuckooFilter::seeded(4, 0).unwrap();
        filter.insert(34);
        let occupied: Vec<_> = filter.iter().filter(|&(_, fp)| fp != EMPTY).collect();
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].1, hash::fingerprint(34));
        assert_eq!(filter.load_factor(), 0.25);
        assert_eq!(filter.iter().count(), 4);
    }
}

#[cfg(test)]
mod proptests;
