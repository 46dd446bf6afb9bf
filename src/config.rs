//! Configuration of a single benchmark run.
//!
//! Where the values come from (flags, environment variables, ...) is up to
//! the front end. This type only checks that they make sense together.

use crate::engine::ConcurrencyModel;
use crate::error::Error;
use pcmbench_nostd_internal::{
    DEFAULT_ROW_BYTE_SIZE, Geometry, InternalError, MAX_THREADS, PartitionPolicy, ShufflePolicy,
};

/// The number of banks used when nothing else is specified
pub const DEFAULT_BANKS: usize = 16;

/// The number of rows per bank used when nothing else is specified
pub const DEFAULT_ROWS_PER_BANK: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    pub bank_count: usize,
    pub rows_per_bank: usize,
    pub row_byte_size: usize,
    /// `None` means one worker per bank
    pub num_threads: Option<usize>,
    /// `None` means every row is sampled
    pub sample: Option<usize>,
    pub shuffle: ShufflePolicy,
    pub partition: PartitionPolicy,
    pub concurrency: ConcurrencyModel,
    /// `None` means the shuffle is seeded from the clock
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bank_count: DEFAULT_BANKS,
            rows_per_bank: DEFAULT_ROWS_PER_BANK,
            row_byte_size: DEFAULT_ROW_BYTE_SIZE,
            num_threads: None,
            sample: None,
            shuffle: ShufflePolicy::Uniform,
            partition: PartitionPolicy::EvenSplit,
            concurrency: ConcurrencyModel::Threaded,
            seed: None,
        }
    }
}

/// A [`BenchConfig`] that passed validation, with every default resolved
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig {
    pub geometry: Geometry,
    pub num_threads: usize,
    pub sample: usize,
    pub shuffle: ShufflePolicy,
    pub partition: PartitionPolicy,
    pub concurrency: ConcurrencyModel,
    pub seed: Option<u64>,
}

impl BenchConfig {
    /// Checks every parameter against its limits.
    ///
    /// This is meant to be called before anything gets allocated.
    pub fn validate(&self) -> Result<ValidatedConfig, Error> {
        let geometry =
            Geometry::with_row_byte_size(self.bank_count, self.rows_per_bank, self.row_byte_size)?;

        let num_threads = self.num_threads.unwrap_or(geometry.bank_count());
        if num_threads == 0 || num_threads > MAX_THREADS {
            return Err(InternalError::IntegerRange {
                description: "num_threads",
                actual: num_threads,
                min_val: 1,
                max_val: MAX_THREADS,
            }
            .into());
        }

        let sample = self.sample.unwrap_or(geometry.row_count());
        if sample > geometry.row_count() {
            return Err(InternalError::SampleTooLarge {
                sample,
                available: geometry.row_count(),
            }
            .into());
        }

        Ok(ValidatedConfig {
            geometry,
            num_threads,
            sample,
            shuffle: self.shuffle,
            partition: self.partition,
            concurrency: self.concurrency,
            seed: self.seed,
        })
    }
}
