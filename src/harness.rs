//! Insert-then-lookup run over a generated key sequence.
//!
//! This is the benchmark loop: generate `num_keys` keys, insert each one,
//! regenerate the same sequence and look each one up, then report. It is
//! the only place in the crate that logs.

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::keys::{KeyGenerator, INIT_KEY};
use crate::report::{RunStats, Snapshot};
use crate::step::{Journal, Phase, StepObserver};
use crate::{CuckooFilter, Fingerprint, Key, MAX_CAPACITY};

pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Bucket count; must be a power of two.
    pub capacity: usize,
    /// Keys to insert and look up.
    pub num_keys: usize,
    /// Generator seed; the first key used is its successor.
    pub init_key: Key,
    /// Seed for the eviction RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_capacity(DEFAULT_CAPACITY)
    }
}

impl HarnessConfig {
    /// Config aiming for 75% occupancy of `capacity` buckets.
    pub fn for_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            num_keys: 3 * (capacity / 4),
            init_key: INIT_KEY,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.capacity.is_power_of_two() || self.capacity > MAX_CAPACITY {
            return Err(Error::CapacityMisconfiguration {
                capacity: self.capacity,
            });
        }
        if self.num_keys == 0 {
            return Err(Error::Config("num_keys must be at least 1".into()));
        }
        Ok(())
    }

    fn keys(&self) -> impl Iterator<Item = Key> {
        KeyGenerator::new(self.init_key).take(self.num_keys)
    }
}

/// Outcome of one run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub snapshot: Snapshot,
    /// Fingerprints lost to overflowing inserts, in order.
    pub dropped: Vec<Fingerprint>,
    /// Slot writes recorded across all inserts.
    pub slot_writes: usize,
    /// Last phase reached.
    pub phase: Option<Phase>,
}

/// Build a filter from `config` and run it.
pub fn run(config: &HarnessConfig) -> Result<RunReport> {
    config.validate()?;
    match config.seed {
        Some(seed) => run_with(&mut CuckooFilter::seeded(config.capacity, seed)?, config),
        None => run_with(&mut CuckooFilter::new(config.capacity)?, config),
    }
}

/// Run against an existing filter. `config.capacity` is ignored.
pub fn run_with<R: Rng>(filter: &mut CuckooFilter<R>, config: &HarnessConfig) -> Result<RunReport> {
    let mut journal = Journal::new();
    journal.on_phase(Phase::Main);

    let total = config.num_keys;
    let mut inserts = 0;
    let mut dropped = Vec::new();
    let mut slot_writes = 0;

    for key in config.keys() {
        journal.on_phase(Phase::GenerateKey);
        journal.clear();
        match filter.insert_observed(key, &mut journal) {
            Ok(ins) => {
                inserts += 1;
                debug!(
                    key = format_args!("{key:04x}"),
                    placed_at = ins.placed_at,
                    relocations = ins.relocations,
                    "insert"
                );
            }
            Err(Error::InsertOverflow { key, dropped: fp }) => {
                warn!(
                    key = format_args!("{key:04x}"),
                    dropped = format_args!("{fp:04x}"),
                    "insert overflowed relocation limit"
                );
                dropped.push(fp);
            }
            Err(e) => return Err(e),
        }
        slot_writes += journal.slot_writes();
        trace!("filter:\n{}", filter.snapshot());
    }
    info!(inserts, total, "inserts/total");

    let mut members = 0;
    for key in config.keys() {
        journal.on_phase(Phase::GenerateKey);
        let member = filter.lookup_observed(key, &mut journal);
        debug!(key = format_args!("{key:04x}"), member, "lookup");
        members += member as usize;
    }
    info!(members, total, "members/total");

    journal.on_phase(Phase::Report);
    Ok(RunReport {
        stats: RunStats {
            successful_inserts: inserts,
            true_lookups: members,
            total_operations: total,
        },
        snapshot: filter.snapshot(),
        dropped,
        slot_writes,
        phase: journal.phase(),
    })
}
