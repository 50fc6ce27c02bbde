use crate::{Fingerprint, Key};

/// Errors reported by the filter and the run harness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The relocation chain hit `MAX_RELOCATIONS` with a fingerprint still
    /// displaced. That fingerprint is gone from the filter.
    #[error("insert of key {key:#06x} overflowed; fingerprint {dropped:#06x} was dropped")]
    InsertOverflow { key: Key, dropped: Fingerprint },

    /// Capacity must be a nonzero power of two no larger than the 16-bit
    /// index space.
    #[error("capacity {capacity} is not a power of two in 1..=65536")]
    CapacityMisconfiguration { capacity: usize },

    /// A step record addresses a slot outside this filter.
    #[error("step addresses slot {index} but capacity is {capacity}")]
    StepOutOfRange { index: usize, capacity: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
