//! Folds the per-slot results into a single value.
//!
//! This only ever happens on the calling thread, after
//! [`crate::run_slots`] has returned. At that point every slot has
//! finished, so the results are final.

use crate::error::Error;
use crate::slot::WorkerSlot;

/// Calls `combine` once per slot with that slot's accumulated result, in
/// ascending slot order.
pub fn reduce_slots(slots: &[WorkerSlot], mut combine: impl FnMut(u64)) {
    for slot in slots {
        combine(slot.accumulated_result());
    }
}

/// A running total that lives for the duration of one run.
///
/// The caller owns it and passes [`CountAccumulator::add`] as the combining
/// callback of [`reduce_slots`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountAccumulator {
    total: u64,
}

impl CountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.total = 0;
    }

    /// Adds `count` to the total, returning the new total. On overflow,
    /// this returns `None` and the total is left unchanged.
    pub fn add(&mut self, count: u64) -> Option<u64> {
        self.total = self.total.checked_add(count)?;
        Some(self.total)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Shorthand for reducing with a fresh [`CountAccumulator`].
///
/// Fails if the total doesn't fit in a `u64`; the error names the slot
/// whose result pushed it over.
pub fn total_count(slots: &[WorkerSlot]) -> Result<u64, Error> {
    let mut accum = CountAccumulator::new();
    let mut overflowed_at = None;
    let mut slot = 0;
    reduce_slots(slots, |count| {
        if accum.add(count).is_none() && overflowed_at.is_none() {
            overflowed_at = Some(slot);
        }
        slot += 1;
    });
    match overflowed_at {
        Some(slot) => Err(Error::count_overflow(slot)),
        None => Ok(accum.total()),
    }
}
