/*!
A micro-benchmark harness that emulates how a bank-organized memory array
(think of the rows & banks of a PCM or DRAM device) gets partitioned among a
pool of workers under different data-placement and scheduling policies.

<div class="warning">

This is a fixed-shape, run-once partition-and-reduce harness. It isn't a
general purpose scheduler.

</div>

# Overview

A run proceeds in a fixed sequence:

1. the [`Geometry`] fixes the number of banks, the rows per bank and the row
   size. Rows are interleaved over banks (`bank(r) = r % bank_count`).
2. [`shuffle_rows`] orders the row indices (see [`ShufflePolicy`])
3. [`partition_rows`] buckets the first `sample` indices of that order into
   worker slots (see [`PartitionPolicy`])
4. [`populate_slots`] turns each slot's indices into exclusive references to
   the rows of a caller-owned [`RowBuffer`]
5. [`run_slots`] applies each slot's [`Operation`] to its rows, using either
   one thread per slot or a parallel-for (see [`ConcurrencyModel`])
6. [`reduce_slots`] folds the per-slot results, in slot order

[`Harness`] performs all of these steps for a [`BenchConfig`].

# Developer Guide

The index-only machinery lives in [`pcmbench_nostd_internal`] (which doesn't
depend on `std`). Everything that owns memory or spawns threads lives here.

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod config;
mod engine;
mod error;
mod harness;
mod memory;
mod reduce;
mod slot;
pub mod workload;

// pull in symbols that visible outside of the package
pub use config::{BenchConfig, DEFAULT_BANKS, DEFAULT_ROWS_PER_BANK, ValidatedConfig};
pub use engine::{ConcurrencyModel, map_operation, populate_slots, run_slots};
pub use error::{Error, ErrorKind};
pub use harness::{Harness, RunPlan, RunReport, time_seeded_rng};
pub use memory::{RowBuffer, RowRef, RowTable};
pub use pcmbench_nostd_internal::{
    DEFAULT_ROW_BYTE_SIZE, Geometry, InternalError, MAX_BANKS, MAX_ROWS_PER_BANK, MAX_THREADS,
    PartitionPolicy, SampleBankStats, ShufflePolicy, SlotBankOccupancy, bank_grouped_order,
    partition_rows, shuffle_rows, slot_capacity,
};
pub use reduce::{CountAccumulator, reduce_slots, total_count};
pub use slot::{CountFn, Operation, PairFn, TransformFn, WorkerSlot};
