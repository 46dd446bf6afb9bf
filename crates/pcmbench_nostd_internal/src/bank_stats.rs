//! Summaries of how rows are distributed over the banks.
//!
//! These don't influence a run at all. They exist so that the harness can
//! report how "balanced" a sample or a partition is, which is the whole point
//! of comparing the shuffle/partition policies.

use crate::error::InternalError;
use crate::geometry::Geometry;
use alloc::vec;
use ndarray::{Array2, ArrayView2, Axis};

/// Describes how the sampled prefix of a row order falls into banks
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBankStats {
    pub sample: usize,
    pub row_count: usize,
    /// the largest number of sampled rows that share a single bank
    pub max_rows_per_bank: usize,
    /// `sample / bank_count`, rounded down
    pub avg_rows_per_bank: usize,
}

impl SampleBankStats {
    pub fn from_order(
        geometry: &Geometry,
        order: &[usize],
        sample: usize,
    ) -> Result<Self, InternalError> {
        if sample > order.len() {
            return Err(InternalError::SampleTooLarge {
                sample,
                available: order.len(),
            });
        }
        let mut per_bank = vec![0_usize; geometry.bank_count()];
        for &row in &order[..sample] {
            geometry.check_row(row)?;
            per_bank[geometry.bank(row)] += 1;
        }
        Ok(Self {
            sample,
            row_count: geometry.row_count(),
            max_rows_per_bank: per_bank.iter().cloned().max().unwrap_or(0),
            avg_rows_per_bank: sample / geometry.bank_count(),
        })
    }

    /// fraction of all rows that were sampled
    pub fn sampling_fraction(&self) -> f64 {
        self.sample as f64 / self.row_count as f64
    }

    /// `max_rows_per_bank / avg_rows_per_bank`. A perfectly balanced sample
    /// gives 1. This is `None` when the average rounds down to 0.
    pub fn max_over_avg(&self) -> Option<f64> {
        if self.avg_rows_per_bank == 0 {
            None
        } else {
            Some(self.max_rows_per_bank as f64 / self.avg_rows_per_bank as f64)
        }
    }
}

/// The number of rows each slot holds from each bank.
///
/// Axis 0 is the slot, axis 1 is the bank.
pub struct SlotBankOccupancy {
    counts: Array2<usize>,
}

impl SlotBankOccupancy {
    /// `slots` holds the row indices of each slot (i.e. the output of
    /// [`crate::partition_rows`])
    pub fn new<S: AsRef<[usize]>>(
        geometry: &Geometry,
        slots: &[S],
    ) -> Result<Self, InternalError> {
        let mut counts = Array2::<usize>::zeros((slots.len(), geometry.bank_count()));
        for (slot, rows) in slots.iter().enumerate() {
            for &row in rows.as_ref() {
                geometry.check_row(row)?;
                counts[[slot, geometry.bank(row)]] += 1;
            }
        }
        Ok(Self { counts })
    }

    pub fn as_array_view(&self) -> ArrayView2<usize> {
        self.counts.view()
    }

    pub fn rows_in(&self, slot: usize, bank: usize) -> usize {
        self.counts[[slot, bank]]
    }

    /// how many distinct slots hold at least 1 row of `bank`
    pub fn slots_touching(&self, bank: usize) -> usize {
        self.counts
            .index_axis(Axis(1), bank)
            .iter()
            .filter(|&&n| n > 0)
            .count()
    }

    /// The largest number of slots that may end up competing for one bank
    pub fn max_slots_per_bank(&self) -> usize {
        (0..self.counts.len_of(Axis(1)))
            .map(|bank| self.slots_touching(bank))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{PartitionPolicy, partition_rows, slot_capacity};
    use alloc::vec::Vec;

    #[test]
    fn sample_stats() {
        let geometry = Geometry::new(4, 4).unwrap();
        let order: Vec<usize> = (0..16).collect();
        let stats = SampleBankStats::from_order(&geometry, &order, 16).unwrap();
        assert_eq!(stats.max_rows_per_bank, 4);
        assert_eq!(stats.avg_rows_per_bank, 4);
        assert_eq!(stats.max_over_avg(), Some(1.0));
        assert_eq!(stats.sampling_fraction(), 1.0);

        // a bank-major order concentrates the first rows in bank 0
        let grouped = crate::shuffle::bank_grouped_order(&geometry);
        let stats = SampleBankStats::from_order(&geometry, &grouped, 8).unwrap();
        assert_eq!(stats.max_rows_per_bank, 4);
        assert_eq!(stats.avg_rows_per_bank, 2);
        assert_eq!(stats.max_over_avg(), Some(2.0));

        let stats = SampleBankStats::from_order(&geometry, &grouped, 3).unwrap();
        assert_eq!(stats.max_over_avg(), None);

        assert!(SampleBankStats::from_order(&geometry, &order, 17).is_err());
    }

    #[test]
    fn occupancy() {
        let geometry = Geometry::new(2, 8).unwrap();
        let order: Vec<usize> = (0..16).collect();

        let policy = PartitionPolicy::EvenSplit;
        let capacity = slot_capacity(&geometry, policy, 16, 4);
        let even = partition_rows(&geometry, &order, 16, 4, policy, capacity).unwrap();
        let occupancy = SlotBankOccupancy::new(&geometry, &even).unwrap();
        // contiguous chunks of an interleaved order touch every bank
        assert_eq!(occupancy.max_slots_per_bank(), 4);
        assert_eq!(occupancy.rows_in(0, 0), 2);
        assert_eq!(occupancy.rows_in(0, 1), 2);

        let policy = PartitionPolicy::ContentionFree;
        let capacity = slot_capacity(&geometry, policy, 16, 4);
        let free = partition_rows(&geometry, &order, 16, 4, policy, capacity).unwrap();
        let occupancy = SlotBankOccupancy::new(&geometry, &free).unwrap();
        assert_eq!(occupancy.slots_touching(0), 2);
        assert_eq!(occupancy.slots_touching(1), 2);
        assert_eq!(occupancy.as_array_view().sum(), 16);
    }
}
