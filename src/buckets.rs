use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::step::{Phase, SlotWrite, Step, MAX_STEP_SLOTS};
use crate::{Fingerprint, EMPTY};

/// Largest bucket count addressable by a 16-bit digest.
pub const MAX_CAPACITY: usize = 1 << 16;

/// Fixed-length array of single-slot buckets.
///
/// Zero-initialized at construction and never resized. Mutation happens only
/// through [`step`](Self::step), so every write has a matching [`Step`]
/// record.
#[derive(Clone, PartialEq, Eq)]
pub struct BucketStore {
    slots: Box<[Fingerprint]>,
}

impl BucketStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() || capacity > MAX_CAPACITY {
            return Err(Error::CapacityMisconfiguration { capacity });
        }
        Ok(Self {
            slots: vec![EMPTY; capacity].into_boxed_slice(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Fingerprint> {
        self.slots.get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Fingerprint] {
        &self.slots
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|&&fp| fp != EMPTY).count()
    }

    /// Apply `f` to the addressed slots as one checkpointed step.
    ///
    /// `f` works on a copy of the slots; the copy is written back afterwards
    /// and the old/new pair of each slot is returned alongside `f`'s result.
    /// Indices must be distinct and in range.
    pub(crate) fn step<const N: usize, T>(
        &mut self,
        phase: Phase,
        indices: [usize; N],
        f: impl FnOnce(&mut [Fingerprint; N]) -> T,
    ) -> (Step, T) {
        debug_assert!(N <= MAX_STEP_SLOTS);
        debug_assert!(N < 2 || indices[0] != indices[1]);

        let before = indices.map(|i| self.slots[i]);
        let mut after = before;
        let out = f(&mut after);

        let mut writes: SmallVec<[SlotWrite; MAX_STEP_SLOTS]> = SmallVec::new();
        for ((&index, &old), &new) in indices.iter().zip(&before).zip(&after) {
            self.slots[index] = new;
            writes.push(SlotWrite { index, old, new });
        }
        (Step { phase, writes }, out)
    }

    /// Restore the prior value of every slot in `step`.
    pub(crate) fn revert(&mut self, step: &Step) -> Result<()> {
        self.check_step(step)?;
        for w in step.writes.iter().rev() {
            self.slots[w.index] = w.old;
        }
        Ok(())
    }

    /// Write the new value of every slot in `step`.
    pub(crate) fn reapply(&mut self, step: &Step) -> Result<()> {
        self.check_step(step)?;
        for w in &step.writes {
            self.slots[w.index] = w.new;
        }
        Ok(())
    }

    /// Fails if `step` addresses a slot outside this store.
    pub(crate) fn check_step(&self, step: &Step) -> Result<()> {
        match step.writes.iter().find(|w| w.index >= self.capacity()) {
            Some(w) => Err(Error::StepOutOfRange {
                index: w.index,
                capacity: self.capacity(),
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for BucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketStore")
            .field("capacity", &self.capacity())
            .field("occupied", &self.occupied())
            .finish()
    }
}
