//! Checkpointed mutation steps.
//!
//! Every write the filter makes to its bucket store goes through
//! [`BucketStore::step`](crate::BucketStore), which captures the prior value
//! of each addressed slot and returns a [`Step`] describing the old/new pair.
//! An external recovery layer can keep these records (see [`Journal`]) and
//! undo or redo a partially completed operation after an interruption.
//!
//! Phase markers take the place of a shared "current task" variable: they
//! are delivered to a [`StepObserver`] as the algorithm moves through its
//! stages.

use smallvec::SmallVec;

use crate::error::Result;
use crate::{CuckooFilter, Fingerprint};

/// Upper bound on the number of slots one step may address.
pub const MAX_STEP_SLOTS: usize = 2;

/// Stage of the insert/lookup algorithm (or of the run harness).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Main,
    GenerateKey,
    InsertFingerprint,
    InsertIndex1,
    InsertIndex2,
    /// Placement of the new fingerprint into one of its two candidate slots.
    InsertUpdate,
    RelocateVictim,
    /// Move of a displaced fingerprint into its alternate slot.
    RelocateUpdate,
    LookupFingerprint,
    LookupIndex1,
    LookupIndex2,
    LookupCheck,
    Report,
}

impl Phase {
    /// Stable numeric id, suitable for a progress register or a log field.
    pub const fn id(self) -> u8 {
        match self {
            Phase::Main => 1,
            Phase::GenerateKey => 2,
            Phase::InsertFingerprint => 3,
            Phase::InsertIndex1 => 4,
            Phase::InsertIndex2 => 5,
            Phase::InsertUpdate => 6,
            Phase::RelocateVictim => 7,
            Phase::RelocateUpdate => 8,
            Phase::LookupFingerprint => 9,
            Phase::LookupIndex1 => 10,
            Phase::LookupIndex2 => 11,
            Phase::LookupCheck => 12,
            Phase::Report => 13,
        }
    }

    /// Whether steps in this phase mutate the bucket store.
    pub const fn is_mutating(self) -> bool {
        matches!(self, Phase::InsertUpdate | Phase::RelocateUpdate)
    }
}

/// Prior and new value of one slot touched by a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotWrite {
    pub index: usize,
    pub old: Fingerprint,
    pub new: Fingerprint,
}

/// Reversible record of a single mutation.
///
/// Every addressed slot is recorded, including ones the mutation left
/// unchanged, so that undoing the step restores the exact prior state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub writes: SmallVec<[SlotWrite; MAX_STEP_SLOTS]>,
}

/// Receives phase markers and step records from the filter.
///
/// Both hooks default to no-ops, so an observer only implements what it
/// needs. `()` is the observer used by the plain `insert`/`lookup` calls.
pub trait StepObserver {
    fn on_phase(&mut self, _phase: Phase) {}

    fn on_step(&mut self, _step: &Step) {}
}

impl StepObserver for () {}

impl<O: StepObserver + ?Sized> StepObserver for &mut O {
    #[inline]
    fn on_phase(&mut self, phase: Phase) {
        (**self).on_phase(phase);
    }

    #[inline]
    fn on_step(&mut self, step: &Step) {
        (**self).on_step(step);
    }
}

/// Observer that records steps in order and tracks the latest phase.
///
/// The journal does not decide what to do after an interruption; it only
/// offers [`rollback`](Journal::rollback) and [`replay`](Journal::replay)
/// so a recovery component can apply its own policy.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    phase: Option<Phase>,
    steps: Vec<Step>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent phase marker seen, if any.
    #[inline]
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total slot writes across all recorded steps.
    pub fn slot_writes(&self) -> usize {
        self.steps.iter().map(|s| s.writes.len()).sum()
    }

    /// Forget recorded steps. The current phase is kept.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Undo every recorded step, newest first, and empty the journal.
    ///
    /// Every step is checked against `filter` before anything is undone, so
    /// on error both the filter and the journal are left untouched.
    /// Returns the number of steps undone.
    pub fn rollback<R>(&mut self, filter: &mut CuckooFilter<R>) -> Result<usize> {
        self.check(filter)?;
        let n = self.steps.len();
        while let Some(step) = self.steps.pop() {
            filter.revert(&step)?;
        }
        Ok(n)
    }

    /// Reapply every recorded step in order. The journal is left intact.
    ///
    /// Like [`rollback`](Self::rollback), nothing is written unless every
    /// step fits `filter`.
    pub fn replay<R>(&self, filter: &mut CuckooFilter<R>) -> Result<usize> {
        self.check(filter)?;
        for step in &self.steps {
            filter.reapply(step)?;
        }
        Ok(self.steps.len())
    }

    fn check<R>(&self, filter: &CuckooFilter<R>) -> Result<()> {
        self.steps
            .iter()
            .try_for_each(|step| filter.store().check_step(step))
    }
}

impl StepObserver for Journal {
    fn on_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    fn on_step(&mut self, step: &Step) {
        self.steps.push(step.clone());
    }
}
