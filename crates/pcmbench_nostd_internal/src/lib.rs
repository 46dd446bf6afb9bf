//! The pure parts of the row-partitioning engine.
//!
//! Nothing in here spawns threads, owns the memory array, or touches I/O.
//! Everything works in terms of row *indices*; converting indices into
//! references to actual row memory is the job of the `pcmbench` crate.
//!
//! The pieces, leaves first:
//! - [`Geometry`] describes the shape of the bank-organized array
//! - [`shuffle_rows`] produces the processing order of the rows
//! - [`partition_rows`] buckets a prefix ("sample") of that order into
//!   worker slots
//! - [`SampleBankStats`] and [`SlotBankOccupancy`] summarize how a sample (or
//!   a partition) is distributed across banks

#![no_std]
extern crate alloc;

mod bank_stats;
mod error;
mod geometry;
mod partition;
mod shuffle;

pub use bank_stats::{SampleBankStats, SlotBankOccupancy};
pub use error::InternalError;
pub use geometry::{
    DEFAULT_ROW_BYTE_SIZE, Geometry, MAX_BANKS, MAX_ROWS_PER_BANK, MAX_THREADS,
};
pub use partition::{PartitionPolicy, partition_rows, slot_capacity};
pub use shuffle::{ShufflePolicy, bank_grouped_order, shuffle_rows};
