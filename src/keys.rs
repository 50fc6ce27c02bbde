//! Deterministic key sequence for exercising the filter.
//!
//! Consecutive integers hash to consecutive DJB2 digests, so the harness
//! spreads keys with `k' = (k + 1) * 17` instead. The sequence is cheap to
//! regenerate, which lets the lookup pass replay exactly the inserted keys
//! without storing them.

use crate::Key;

pub const INIT_KEY: Key = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyGenerator {
    current: Key,
}

impl KeyGenerator {
    /// Sequence that starts *after* `init`; `init` itself is never yielded.
    pub fn new(init: Key) -> Self {
        Self { current: init }
    }

    #[inline]
    pub fn successor(key: Key) -> Key {
        key.wrapping_add(1).wrapping_mul(17)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(INIT_KEY)
    }
}

impl Iterator for KeyGenerator {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        self.current = Self::successor(self.current);
        Some(self.current)
    }
}
