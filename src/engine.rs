//! Drives the worker slots.
//!
//! A run is a bulk-synchronous fork-join: every slot is started, every slot
//! runs to completion, and then (and only then) control returns to the
//! caller. There is no communication between slots while they run. The row
//! lists of different slots are disjoint (see [`crate::memory::RowTable`]),
//! and each slot only writes to its own accumulator, so no locking is needed.
//!
//! There are 2 interchangeable ways to provide the workers:
//! - [`ConcurrencyModel::Threaded`] spawns a dedicated OS thread per slot and
//!   joins all of them
//! - [`ConcurrencyModel::Cooperative`] runs the slots inside of a single
//!   parallel-for over a pool holding one worker per slot
//!
//! Either way, the call doesn't return until every slot is done (or until a
//! failure is detected). There is no cancellation: a callback that never
//! returns stalls the whole run.

use crate::error::Error;
use crate::memory::RowBuffer;
use crate::slot::{Operation, WorkerSlot};
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use tracing::debug;

/// Selects how the workers of a run are provided
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConcurrencyModel {
    /// one native thread per slot
    #[default]
    Threaded,
    /// a parallel-for over the slots, bounded to one worker per slot
    Cooperative,
}

/// Converts the index-level partition into worker slots.
///
/// `assignments[i]` holds the row indices of slot `i` (the output of
/// [`pcmbench_nostd_internal::partition_rows`]). Every slot is built with
/// room for `capacity` rows; the capacity is checked before each append.
///
/// Handing the same row to 2 slots is an error.
pub fn populate_slots<'a, S: AsRef<[usize]>>(
    buffer: &'a mut RowBuffer,
    assignments: &[S],
    capacity: usize,
) -> Result<Vec<WorkerSlot<'a>>, Error> {
    let mut table = buffer.rows_mut();
    let mut slots = Vec::new();
    slots.try_reserve_exact(assignments.len()).map_err(|_| {
        Error::allocation(
            "the worker slots",
            assignments.len().saturating_mul(size_of::<WorkerSlot>()),
        )
    })?;
    for (id, rows) in assignments.iter().enumerate() {
        let mut slot = WorkerSlot::new(id, capacity)?;
        for &row in rows.as_ref() {
            slot.push_row(table.take(row)?)?;
        }
        slots.push(slot);
    }
    Ok(slots)
}

/// Assigns the same operation to every slot
pub fn map_operation<'a>(slots: &mut [WorkerSlot<'a>], operation: Operation<'a>) {
    for slot in slots.iter_mut() {
        slot.set_operation(operation);
    }
}

/// Runs every slot to completion with the specified concurrency model.
///
/// Preconditions of every slot are checked before anything is started, so
/// on a precondition failure no slot has run. A slot that fails (a panicking
/// callback is reported as [`crate::ErrorKind::WorkerPanicked`]) is only
/// reported after all other workers have finished. When several slots fail,
/// the lowest one is reported.
pub fn run_slots(slots: &mut [WorkerSlot], model: ConcurrencyModel) -> Result<(), Error> {
    for slot in slots.iter() {
        slot.check_preconditions()?;
    }
    if slots.is_empty() {
        return Ok(());
    }

    debug!(n_slots = slots.len(), ?model, "starting run");
    match model {
        ConcurrencyModel::Threaded => run_threaded(slots),
        ConcurrencyModel::Cooperative => run_cooperative(slots),
    }
}

fn run_threaded(slots: &mut [WorkerSlot]) -> Result<(), Error> {
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(slots.len());
        let mut result = Ok(());
        for slot in slots.iter_mut() {
            let id = slot.id();
            let spawned = thread::Builder::new()
                .name(format!("pcm-slot-{id}"))
                .spawn_scoped(scope, move || slot.run());
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(err) => {
                    // the threads that did start still get joined below
                    result = Err(Error::spawn(id, err));
                    break;
                }
            }
        }

        // this is the join barrier
        for (id, handle) in handles {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::worker_panicked(id)),
            };
            if result.is_ok() {
                result = outcome;
            }
        }
        result
    })
}

fn run_cooperative(slots: &mut [WorkerSlot]) -> Result<(), Error> {
    let num_threads = slots.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("pcm-worker-{i}"))
        .build()
        .map_err(|err| Error::thread_pool(num_threads, err.to_string()))?;

    // we catch panics per slot (rather than letting rayon propagate the
    // first one) so that the reported slot doesn't depend on scheduling
    let outcomes: Vec<Result<(), Error>> = pool.install(|| {
        slots
            .par_iter_mut()
            .with_max_len(1)
            .map(|slot| {
                let id = slot.id();
                catch_unwind(AssertUnwindSafe(|| slot.run()))
                    .unwrap_or_else(|_| Err(Error::worker_panicked(id)))
            })
            .collect()
    });

    // the outcomes are in slot order
    outcomes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pcmbench_nostd_internal::Geometry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MODELS: [ConcurrencyModel; 2] =
        [ConcurrencyModel::Threaded, ConcurrencyModel::Cooperative];

    #[test]
    fn populate_respects_assignments() {
        let geometry = Geometry::with_row_byte_size(2, 4, 8).unwrap();
        let mut buffer = RowBuffer::new(geometry).unwrap();
        let assignments: Vec<Vec<usize>> = vec![vec![7, 0], vec![], vec![3, 4, 5]];
        let slots = populate_slots(&mut buffer, &assignments, 3).unwrap();
        assert_eq!(slots.len(), 3);
        for (slot, rows) in slots.iter().zip(assignments.iter()) {
            assert_eq!(slot.row_indices().collect::<Vec<_>>(), *rows);
            assert_eq!(slot.capacity(), 3);
        }
    }

    #[test]
    fn populate_rejects_overlap_and_overflow() {
        let geometry = Geometry::with_row_byte_size(2, 4, 8).unwrap();
        let mut buffer = RowBuffer::new(geometry).unwrap();
        let overlapping: [Vec<usize>; 2] = [vec![1, 2], vec![2]];
        let err = populate_slots(&mut buffer, &overlapping, 4).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::DuplicateRow { row: 2 }));

        let too_many: [Vec<usize>; 1] = [vec![0, 1, 2]];
        let err = populate_slots(&mut buffer, &too_many, 2).err().unwrap();
        assert!(matches!(
            err.kind(),
            ErrorKind::SlotCapacity {
                slot: 0,
                capacity: 2
            }
        ));
    }

    #[test]
    fn every_row_visited_once() {
        let geometry = Geometry::with_row_byte_size(4, 8, 16).unwrap();
        let assignments: Vec<Vec<usize>> = (0..4)
            .map(|slot| (0..8).map(|i| i * 4 + slot).collect())
            .collect();
        let increment = |row: &mut [u8]| row.iter_mut().for_each(|b| *b += 1);

        for model in MODELS {
            let mut buffer = RowBuffer::new(geometry).unwrap();
            let mut slots = populate_slots(&mut buffer, &assignments, 8).unwrap();
            map_operation(&mut slots, Operation::Transform(&increment));
            run_slots(&mut slots, model).unwrap();
            drop(slots);
            assert!(buffer.as_bytes().iter().all(|&b| b == 1), "{model:?}");
        }
    }

    #[test]
    fn counts_match_between_models() {
        let geometry = Geometry::with_row_byte_size(3, 5, 4).unwrap();
        let assignments: Vec<Vec<usize>> =
            vec![vec![0, 1, 2, 3], vec![4, 5], vec![6, 7, 8, 9, 10]];
        let count_one = |_: &[u8]| 1_u64;
        for model in MODELS {
            let mut buffer = RowBuffer::new(geometry).unwrap();
            let mut slots = populate_slots(&mut buffer, &assignments, 5).unwrap();
            map_operation(&mut slots, Operation::Count(&count_one));
            run_slots(&mut slots, model).unwrap();
            let results: Vec<u64> = slots.iter().map(|s| s.accumulated_result()).collect();
            assert_eq!(results, [4, 2, 5], "{model:?}");
        }
    }

    #[test]
    fn odd_pairwise_rejected_before_any_work() {
        let geometry = Geometry::with_row_byte_size(2, 4, 4).unwrap();
        let assignments: Vec<Vec<usize>> = vec![vec![0, 1], vec![2, 3, 4]];
        let calls = AtomicUsize::new(0);
        let pair = |_: &mut [u8], _: &mut [u8]| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        for model in MODELS {
            let mut buffer = RowBuffer::new(geometry).unwrap();
            let mut slots = populate_slots(&mut buffer, &assignments, 4).unwrap();
            map_operation(&mut slots, Operation::PairwiseEven(&pair));
            let err = run_slots(&mut slots, model).unwrap_err();
            assert!(matches!(
                err.kind(),
                ErrorKind::OddPairwiseRows { slot: 1, n_rows: 3 }
            ));
        }
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn panics_become_errors() {
        let geometry = Geometry::with_row_byte_size(4, 1, 4).unwrap();
        let assignments: Vec<Vec<usize>> = vec![vec![0], vec![1], vec![2], vec![3]];
        let explode_on_row_two = |row: &[u8]| {
            if row[0] == 2 {
                panic!("boom");
            }
            1_u64
        };
        for model in MODELS {
            let mut buffer = RowBuffer::new(geometry).unwrap();
            for r in 0..4 {
                buffer.row_mut(r).fill(r as u8);
            }
            let mut slots = populate_slots(&mut buffer, &assignments, 1).unwrap();
            map_operation(&mut slots, Operation::Count(&explode_on_row_two));
            let err = run_slots(&mut slots, model).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::WorkerPanicked { slot: 2 }),
                "{model:?}"
            );
        }
    }

    #[test]
    fn cooperative_pool_has_one_worker_per_slot() {
        let geometry = Geometry::with_row_byte_size(3, 1, 4).unwrap();
        let assignments: Vec<Vec<usize>> = vec![vec![0], vec![1], vec![2]];
        let pool_size = |_: &[u8]| rayon::current_num_threads() as u64;
        let mut buffer = RowBuffer::new(geometry).unwrap();
        let mut slots = populate_slots(&mut buffer, &assignments, 1).unwrap();
        map_operation(&mut slots, Operation::Count(&pool_size));
        run_slots(&mut slots, ConcurrencyModel::Cooperative).unwrap();
        for slot in &slots {
            assert_eq!(slot.accumulated_result(), slots.len() as u64);
        }
    }

    #[test]
    fn overflowing_counts_fail_the_run() {
        let geometry = Geometry::with_row_byte_size(2, 2, 4).unwrap();
        let assignments: Vec<Vec<usize>> = vec![vec![0], vec![1, 2, 3]];
        let huge = |_: &[u8]| u64::MAX / 2;
        for model in MODELS {
            let mut buffer = RowBuffer::new(geometry).unwrap();
            let mut slots = populate_slots(&mut buffer, &assignments, 3).unwrap();
            map_operation(&mut slots, Operation::Count(&huge));
            let err = run_slots(&mut slots, model).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::CountOverflow { slot: 1 }),
                "{model:?}"
            );
        }
    }

    #[test]
    fn empty_runs() {
        for model in MODELS {
            let mut slots: Vec<WorkerSlot> = Vec::new();
            assert!(run_slots(&mut slots, model).is_ok());
        }
    }
}
