//! Worker slots: the unit of work handed to a single worker.

use crate::error::Error;
use crate::memory::RowRef;

/// callback that modifies a row in place
pub type TransformFn<'a> = dyn Fn(&mut [u8]) + Sync + 'a;
/// callback that counts something inside of a row
pub type CountFn<'a> = dyn Fn(&[u8]) -> u64 + Sync + 'a;
/// callback that operates on 2 adjacent rows of a slot
pub type PairFn<'a> = dyn Fn(&mut [u8], &mut [u8]) + Sync + 'a;

/// The operation that a slot applies to its rows.
///
/// A slot holds exactly one of these, so "a slot has both a count and a
/// transform callback" simply can't be expressed.
#[derive(Clone, Copy)]
pub enum Operation<'a> {
    /// the slot does nothing when run
    None,
    /// calls the callback once per row, in list order
    Transform(&'a TransformFn<'a>),
    /// calls the callback once per row and sums the returned values into the
    /// slot's accumulated result
    Count(&'a CountFn<'a>),
    /// calls the callback on the pairs `(0, 1), (2, 3), ...` of the row list
    PairwiseEven(&'a PairFn<'a>),
    /// calls the callback on the pairs `(1, 2), (3, 4), ...` of the row list.
    ///
    /// Alternating this with [`Operation::PairwiseEven`] compares every pair
    /// of neighbors in the list (this is an odd-even transposition sort when
    /// the callback swaps out-of-order rows).
    PairwiseOdd(&'a PairFn<'a>),
}

impl Operation<'_> {
    pub fn is_pairwise(&self) -> bool {
        matches!(self, Operation::PairwiseEven(_) | Operation::PairwiseOdd(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::None => "none",
            Operation::Transform(_) => "transform",
            Operation::Count(_) => "count",
            Operation::PairwiseEven(_) => "pairwise-even",
            Operation::PairwiseOdd(_) => "pairwise-odd",
        }
    }
}

impl core::fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A worker's rows, its operation, and its result.
///
/// `accumulated_result` is only written by [`WorkerSlot::run`]. Running needs
/// `&mut self`, so nothing can observe the result while a run is in flight.
pub struct WorkerSlot<'a> {
    id: usize,
    capacity: usize,
    rows: Vec<RowRef<'a>>,
    operation: Operation<'a>,
    accumulated_result: u64,
}

impl<'a> WorkerSlot<'a> {
    /// Builds an empty slot that accepts at most `capacity` rows.
    ///
    /// All of the memory is reserved up front.
    pub fn new(id: usize, capacity: usize) -> Result<Self, Error> {
        let mut rows = Vec::new();
        rows.try_reserve_exact(capacity).map_err(|_| {
            Error::allocation(
                "the rows of a worker slot",
                capacity.saturating_mul(size_of::<RowRef>()),
            )
        })?;
        Ok(Self {
            id,
            capacity,
            rows,
            operation: Operation::None,
            accumulated_result: 0,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// indices of the assigned rows, in list order
    pub fn row_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().map(RowRef::index)
    }

    /// Appends a row. The capacity is checked first, so a full slot is left
    /// untouched.
    pub fn push_row(&mut self, row: RowRef<'a>) -> Result<(), Error> {
        if self.rows.len() >= self.capacity {
            return Err(Error::slot_capacity(self.id, self.capacity));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn set_operation(&mut self, operation: Operation<'a>) {
        self.operation = operation;
    }

    pub fn accumulated_result(&self) -> u64 {
        self.accumulated_result
    }

    /// Checks that the slot's operation can be applied to its rows
    pub fn check_preconditions(&self) -> Result<(), Error> {
        if self.operation.is_pairwise() && self.rows.len() % 2 != 0 {
            Err(Error::odd_pairwise_rows(self.id, self.rows.len()))
        } else {
            Ok(())
        }
    }

    /// Applies the operation to every row.
    ///
    /// The engine calls [`WorkerSlot::check_preconditions`] on every slot
    /// before calling this. A pairwise operation on an odd number of rows
    /// leaves the last row alone. A count that overflows `u64` is an error,
    /// and the accumulated result is left at 0.
    pub fn run(&mut self) -> Result<(), Error> {
        self.accumulated_result = 0;
        match self.operation {
            Operation::None => (),
            Operation::Transform(f) => {
                for row in self.rows.iter_mut() {
                    f(row.bytes_mut());
                }
            }
            Operation::Count(f) => {
                let mut count = 0_u64;
                for row in self.rows.iter() {
                    count = count
                        .checked_add(f(row.bytes()))
                        .ok_or_else(|| Error::count_overflow(self.id))?;
                }
                self.accumulated_result = count;
            }
            Operation::PairwiseEven(f) => pairwise_pass(&mut self.rows, f),
            Operation::PairwiseOdd(f) => {
                if !self.rows.is_empty() {
                    pairwise_pass(&mut self.rows[1..], f)
                }
            }
        }
        Ok(())
    }
}

fn pairwise_pass(rows: &mut [RowRef], f: &PairFn<'_>) {
    for pair in rows.chunks_exact_mut(2) {
        if let [left, right] = pair {
            f(left.bytes_mut(), right.bytes_mut());
        }
    }
}
