//! Read-only views for reporting a run.

use std::fmt;

use crate::{Fingerprint, EMPTY};

/// Slots printed per line by [`Snapshot`]'s `Display`.
pub const SLOTS_PER_LINE: usize = 8;

/// Copy of the bucket array taken at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    slots: Box<[Fingerprint]>,
}

impl Snapshot {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slots(&self) -> &[Fingerprint] {
        &self.slots
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|&&fp| fp != EMPTY).count()
    }
}

impl From<&[Fingerprint]> for Snapshot {
    fn from(slots: &[Fingerprint]) -> Self {
        Self {
            slots: slots.into(),
        }
    }
}

/// Hex dump, `SLOTS_PER_LINE` four-digit values per line.
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.slots.chunks(SLOTS_PER_LINE).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, fp) in line.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{fp:04x}")?;
            }
        }
        Ok(())
    }
}

/// Counters from one insert-then-lookup pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub successful_inserts: usize,
    pub true_lookups: usize,
    /// Keys generated; each was inserted once and looked up once.
    pub total_operations: usize,
}

impl RunStats {
    pub fn failed_inserts(&self) -> usize {
        self.total_operations.saturating_sub(self.successful_inserts)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stats: inserts {} members {} total {}",
            self.successful_inserts, self.true_lookups, self.total_operations
        )
    }
}
