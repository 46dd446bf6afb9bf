//! Assigns the sampled rows to worker slots.
//!
//! This file works purely in terms of row indices. The `pcmbench` crate
//! turns each index into a reference to the row's memory afterwards.
//!
//! Regardless of the policy, every sampled row ends up in exactly one slot.
//! The policies only differ in how rows of a given bank are spread across the
//! slots.

use crate::error::InternalError;
use crate::geometry::{Geometry, MAX_THREADS};
use alloc::vec;
use alloc::vec::Vec;

/// Selects how [`partition_rows`] assigns rows to slots
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// contiguous chunks of the sample. The first `sample % num_threads`
    /// slots each get one extra row. Bank membership is ignored.
    EvenSplit,
    /// the slot is derived from the row's bank, so that rows sharing a bank
    /// are spread over several slots (when there are more slots than banks)
    /// or all rows of a bank land in one slot (otherwise). Either way, two
    /// slots never compete for a bank that a third slot is also hammering.
    ContentionFree,
}

fn check_num_threads(num_threads: usize) -> Result<(), InternalError> {
    if num_threads == 0 || num_threads > MAX_THREADS {
        Err(InternalError::integer_range(
            "num_threads",
            num_threads,
            1,
            MAX_THREADS,
        ))
    } else {
        Ok(())
    }
}

/// The largest number of rows that `policy` can possibly put into a single
/// slot, for a sample of `sample` rows spread over `num_threads` slots.
///
/// For [`PartitionPolicy::ContentionFree`] this accounts for the most skewed
/// sample possible (i.e. one where a slot's banks are fully sampled).
pub fn slot_capacity(
    geometry: &Geometry,
    policy: PartitionPolicy,
    sample: usize,
    num_threads: usize,
) -> usize {
    let num_threads = num_threads.max(1);
    match policy {
        PartitionPolicy::EvenSplit => sample.div_ceil(num_threads),
        PartitionPolicy::ContentionFree => {
            let bank_count = geometry.bank_count();
            let rows_per_bank = geometry.rows_per_bank();
            let worst = if bank_count >= num_threads {
                bank_count.div_ceil(num_threads) * rows_per_bank
            } else {
                let threads_per_bank = num_threads / bank_count;
                rows_per_bank.min(sample).div_ceil(threads_per_bank)
            };
            worst.min(sample)
        }
    }
}

// appends `row` to `slot_rows`, refusing to go beyond `capacity`
fn push_checked(
    slot_rows: &mut Vec<usize>,
    slot: usize,
    row: usize,
    capacity: usize,
) -> Result<(), InternalError> {
    if slot_rows.len() >= capacity {
        Err(InternalError::SlotCapacity { slot, capacity })
    } else {
        slot_rows.push(row);
        Ok(())
    }
}

/// Buckets the first `sample` entries of `order` into `num_threads` slots.
///
/// Each of the returned lists holds the row indices of one slot, in the order
/// they were assigned. No list may grow beyond `capacity` entries: the check
/// happens before every append, so an undersized capacity produces an error
/// rather than a truncated partition. [`slot_capacity`] provides a capacity
/// that is always large enough.
pub fn partition_rows(
    geometry: &Geometry,
    order: &[usize],
    sample: usize,
    num_threads: usize,
    policy: PartitionPolicy,
    capacity: usize,
) -> Result<Vec<Vec<usize>>, InternalError> {
    check_num_threads(num_threads)?;
    if sample > order.len() {
        return Err(InternalError::SampleTooLarge {
            sample,
            available: order.len(),
        });
    }
    let sampled = &order[..sample];
    for &row in sampled {
        geometry.check_row(row)?;
    }

    let mut slots: Vec<Vec<usize>> = (0..num_threads)
        .map(|_| Vec::with_capacity(capacity.min(sample)))
        .collect();

    match policy {
        PartitionPolicy::EvenSplit => {
            let chunk = sample / num_threads;
            let remainder = sample % num_threads;
            let mut start = 0;
            for (slot, slot_rows) in slots.iter_mut().enumerate() {
                let len = chunk + usize::from(slot < remainder);
                for &row in &sampled[start..(start + len)] {
                    push_checked(slot_rows, slot, row, capacity)?;
                }
                start += len;
            }
        }
        PartitionPolicy::ContentionFree => {
            let bank_count = geometry.bank_count();
            if bank_count >= num_threads {
                for &row in sampled {
                    let slot = geometry.bank(row) % num_threads;
                    push_checked(&mut slots[slot], slot, row, capacity)?;
                }
            } else {
                let threads_per_bank = num_threads / bank_count;
                // always starts from zero, for every call
                let mut seen_per_bank = vec![0_usize; bank_count];
                for &row in sampled {
                    let bank = geometry.bank(row);
                    let slot = bank * threads_per_bank + (seen_per_bank[bank] % threads_per_bank);
                    seen_per_bank[bank] += 1;
                    push_checked(&mut slots[slot], slot, row, capacity)?;
                }
            }
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::{ShufflePolicy, shuffle_rows};
    use rand_xoshiro::Xoshiro256PlusPlus;
    use rand_xoshiro::rand_core::SeedableRng;

    fn partition_default(
        geometry: &Geometry,
        order: &[usize],
        sample: usize,
        num_threads: usize,
        policy: PartitionPolicy,
    ) -> Vec<Vec<usize>> {
        let capacity = slot_capacity(geometry, policy, sample, num_threads);
        partition_rows(geometry, order, sample, num_threads, policy, capacity).unwrap()
    }

    // every sampled row shows up in exactly one slot
    fn assert_conserves_sample(slots: &[Vec<usize>], order: &[usize], sample: usize) {
        let mut assigned: Vec<usize> = slots.iter().flatten().cloned().collect();
        let mut expected: Vec<usize> = order[..sample].to_vec();
        assigned.sort_unstable();
        expected.sort_unstable();
        assert_eq!(assigned, expected);
    }

    #[test]
    fn even_split_sizes() {
        let geometry = Geometry::new(8, 16).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(311);
        let order = shuffle_rows(&geometry, ShufflePolicy::Uniform, &mut rng);
        for num_threads in [1, 3, 5, 8, 13] {
            for sample in [0, 1, 7, 64, 101, 128] {
                let slots = partition_default(
                    &geometry,
                    &order,
                    sample,
                    num_threads,
                    PartitionPolicy::EvenSplit,
                );
                assert_eq!(slots.len(), num_threads);
                assert_conserves_sample(&slots, &order, sample);
                let max_len = sample.div_ceil(num_threads);
                let remainder = sample % num_threads;
                for (slot, rows) in slots.iter().enumerate() {
                    assert!(rows.len() <= max_len);
                    let expected = sample / num_threads + usize::from(slot < remainder);
                    assert_eq!(rows.len(), expected);
                }
            }
        }
    }

    #[test]
    fn even_split_is_contiguous() {
        let geometry = Geometry::new(4, 4).unwrap();
        let order: Vec<usize> = (0..16).rev().collect();
        let slots = partition_default(&geometry, &order, 16, 4, PartitionPolicy::EvenSplit);
        for (slot, rows) in slots.iter().enumerate() {
            assert_eq!(rows.as_slice(), &order[slot * 4..(slot + 1) * 4]);
        }
    }

    #[test]
    fn contention_free_more_banks_than_threads() {
        let geometry = Geometry::new(8, 6).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let order = shuffle_rows(&geometry, ShufflePolicy::Uniform, &mut rng);
        for num_threads in [1, 3, 4, 8] {
            for sample in [10, 48] {
                let slots = partition_default(
                    &geometry,
                    &order,
                    sample,
                    num_threads,
                    PartitionPolicy::ContentionFree,
                );
                assert_conserves_sample(&slots, &order, sample);
                for (slot, rows) in slots.iter().enumerate() {
                    for &row in rows {
                        assert_eq!(geometry.bank(row) % num_threads, slot);
                    }
                }
            }
        }
    }

    #[test]
    fn contention_free_fewer_banks_than_threads() {
        let geometry = Geometry::new(2, 8).unwrap();
        // the bank of row r is r % 2, so the banks alternate
        let order: Vec<usize> = (0..16).collect();
        let slots = partition_default(&geometry, &order, 16, 4, PartitionPolicy::ContentionFree);
        // threads_per_bank == 2: bank 0 uses slots 0 & 1, bank 1 uses 2 & 3
        assert_eq!(slots[0], [0, 4, 8, 12]);
        assert_eq!(slots[1], [2, 6, 10, 14]);
        assert_eq!(slots[2], [1, 5, 9, 13]);
        assert_eq!(slots[3], [3, 7, 11, 15]);
    }

    #[test]
    fn contention_free_leftover_threads() {
        // 5 threads over 2 banks: threads_per_bank == 2 and slot 4 stays idle
        let geometry = Geometry::new(2, 5).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
        let order = shuffle_rows(&geometry, ShufflePolicy::Uniform, &mut rng);
        let slots = partition_default(&geometry, &order, 10, 5, PartitionPolicy::ContentionFree);
        assert_conserves_sample(&slots, &order, 10);
        assert!(slots[4].is_empty());
    }

    #[test]
    fn counters_restart_every_call() {
        // repeated calls must produce identical results, which would not be
        // the case if the per-bank counters leaked between calls
        let geometry = Geometry::new(2, 7).unwrap();
        let order: Vec<usize> = (0..14).collect();
        let first = partition_default(&geometry, &order, 9, 4, PartitionPolicy::ContentionFree);
        let second = partition_default(&geometry, &order, 9, 4, PartitionPolicy::ContentionFree);
        assert_eq!(first, second);
    }

    #[test]
    fn skewed_sample_fits_capacity() {
        // a bank-grouped order puts a whole bank at the front of the sample
        let geometry = Geometry::new(3, 9).unwrap();
        let order = crate::shuffle::bank_grouped_order(&geometry);
        for num_threads in [1, 2, 3, 6, 7] {
            let slots = partition_default(
                &geometry,
                &order,
                9,
                num_threads,
                PartitionPolicy::ContentionFree,
            );
            assert_conserves_sample(&slots, &order, 9);
        }
    }

    #[test]
    fn capacity_is_enforced() {
        let geometry = Geometry::new(4, 4).unwrap();
        let order: Vec<usize> = (0..16).collect();
        let result = partition_rows(&geometry, &order, 16, 4, PartitionPolicy::EvenSplit, 3);
        assert_eq!(
            result,
            Err(InternalError::SlotCapacity {
                slot: 0,
                capacity: 3
            })
        );
    }

    #[test]
    fn bad_arguments() {
        let geometry = Geometry::new(4, 4).unwrap();
        let order: Vec<usize> = (0..16).collect();
        let policy = PartitionPolicy::EvenSplit;
        assert!(matches!(
            partition_rows(&geometry, &order, 17, 4, policy, 16),
            Err(InternalError::SampleTooLarge { .. })
        ));
        assert!(matches!(
            partition_rows(&geometry, &order, 16, 0, policy, 16),
            Err(InternalError::IntegerRange { .. })
        ));
        let bad_order = [0, 1, 99];
        assert!(matches!(
            partition_rows(&geometry, &bad_order, 3, 1, policy, 16),
            Err(InternalError::RowOutOfRange { row: 99, .. })
        ));
    }
}
