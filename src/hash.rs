//! DJB2-style hashing and the index derivations built on it.
//!
//! Keys and fingerprints are hashed over their little-endian byte
//! representation. Bucket indices are taken by masking with `capacity - 1`,
//! which is why the bucket count must be a power of two.

use crate::{Fingerprint, Key, EMPTY};

const DJB2_SEED: u32 = 5381;

/// `h = h * 33 + byte` over `bytes`, starting from 5381, truncated to 16 bits.
#[inline]
pub fn hash(bytes: &[u8]) -> u16 {
    let h = bytes.iter().fold(DJB2_SEED, |h, &b| {
        (h << 5).wrapping_add(h).wrapping_add(b as u32)
    });
    (h & 0xFFFF) as u16
}

/// Fingerprint of arbitrary bytes.
///
/// A zero digest would read as an empty slot, so it is remapped to 1.
#[inline]
pub fn fingerprint_of_bytes(bytes: &[u8]) -> Fingerprint {
    match hash(bytes) {
        EMPTY => 1,
        fp => fp,
    }
}

#[inline]
pub fn fingerprint(key: Key) -> Fingerprint {
    fingerprint_of_bytes(&key.to_le_bytes())
}

#[inline]
pub fn index_from_key(key: Key, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    hash(&key.to_le_bytes()) as usize & (capacity - 1)
}

#[inline]
pub fn index_from_fingerprint(fp: Fingerprint, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    hash(&fp.to_le_bytes()) as usize & (capacity - 1)
}

/// Partner bucket of `index` for a fingerprint.
///
/// Self-inverse: `alternate_index(alternate_index(i, fp, c), fp, c) == i`.
/// Relocation relies on this, since only the fingerprint survives once a
/// key has been inserted.
#[inline]
pub fn alternate_index(index: usize, fp: Fingerprint, capacity: usize) -> usize {
    index ^ index_from_fingerprint(fp, capacity)
}

/// Fingerprint and both candidate buckets for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidates {
    pub fingerprint: Fingerprint,
    pub index1: usize,
    pub index2: usize,
}

impl Candidates {
    pub fn for_key(key: Key, capacity: usize) -> Self {
        let fingerprint = fingerprint(key);
        let index1 = index_from_key(key, capacity);
        let index2 = alternate_index(index1, fingerprint, capacity);
        Self {
            fingerprint,
            index1,
            index2,
        }
    }

    /// Whether both candidates name the same bucket.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.index1 == self.index2
    }
}
