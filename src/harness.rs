//! Ties the pieces together into a complete run:
//!
//! 1. shuffle the row indices
//! 2. take the first `sample` of them and partition them into slots
//! 3. turn the partition into worker slots over the caller's buffer
//! 4. run every slot
//! 5. reduce the per-slot results
//!
//! Steps 1 & 2 produce a [`RunPlan`], which only holds indices. A single plan
//! can be executed any number of times (e.g. to alternate the 2 pairwise
//! passes). Each execution builds fresh slots; nothing about a slot outlives
//! the execution.

use crate::config::{BenchConfig, ValidatedConfig};
use crate::engine::{map_operation, populate_slots, run_slots};
use crate::error::Error;
use crate::memory::RowBuffer;
use crate::reduce::{reduce_slots, total_count};
use crate::slot::Operation;
use pcmbench_nostd_internal::{
    Geometry, SampleBankStats, SlotBankOccupancy, partition_rows, shuffle_rows, slot_capacity,
};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// A generator seeded from the wall clock.
///
/// Two calls within the same clock tick produce the same sequence (and thus
/// the same permutation). That's fine for benchmarking; this is not a source
/// of unpredictable randomness.
pub fn time_seeded_rng() -> Xoshiro256PlusPlus {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // keep the low 64 bits, those are the ones that change between calls
    Xoshiro256PlusPlus::seed_from_u64(nanos as u64)
}

/// The index-level description of a run
#[derive(Clone, Debug)]
pub struct RunPlan {
    /// the complete shuffled order. Only the first `sample` entries are used
    pub order: Vec<usize>,
    /// `assignments[i]` holds the rows of slot `i`
    pub assignments: Vec<Vec<usize>>,
    /// the capacity that every slot is built with
    pub slot_capacity: usize,
    pub sample_stats: SampleBankStats,
    /// the largest number of slots that share a bank
    pub max_slots_per_bank: usize,
}

impl RunPlan {
    pub fn rows_per_slot(&self) -> Vec<usize> {
        self.assignments.iter().map(Vec::len).collect()
    }
}

/// What a single execution of a [`RunPlan`] produced
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// the reduced total of every slot's accumulated result
    pub total: u64,
    /// every slot's accumulated result, in slot order
    pub per_slot: Vec<u64>,
    /// time spent between starting the first worker and the join barrier
    pub elapsed: Duration,
}

pub struct Harness {
    config: ValidatedConfig,
}

impl Harness {
    pub fn new(config: &BenchConfig) -> Result<Self, Error> {
        let config = config.validate()?;
        info!(
            bank_count = config.geometry.bank_count(),
            rows_per_bank = config.geometry.rows_per_bank(),
            row_byte_size = config.geometry.row_byte_size(),
            num_threads = config.num_threads,
            sample = config.sample,
            shuffle = ?config.shuffle,
            partition = ?config.partition,
            concurrency = ?config.concurrency,
            "configuration accepted"
        );
        Ok(Self { config })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.config.geometry
    }

    /// Allocates a zeroed buffer that matches the geometry
    pub fn allocate_buffer(&self) -> Result<RowBuffer, Error> {
        RowBuffer::new(self.config.geometry)
    }

    /// Builds a plan, drawing randomness from the configured seed (or from
    /// the clock, when there is no seed)
    pub fn plan(&self) -> Result<RunPlan, Error> {
        match self.config.seed {
            Some(seed) => self.plan_with_rng(&mut Xoshiro256PlusPlus::seed_from_u64(seed)),
            None => self.plan_with_rng(&mut time_seeded_rng()),
        }
    }

    pub fn plan_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunPlan, Error> {
        let geometry = &self.config.geometry;
        let sample = self.config.sample;
        let num_threads = self.config.num_threads;
        let policy = self.config.partition;

        let order = shuffle_rows(geometry, self.config.shuffle, rng);
        debug!(rows = order.len(), policy = ?self.config.shuffle, "shuffled rows");

        if sample < num_threads {
            warn!(sample, num_threads, "fewer sampled rows than workers, some slots stay empty");
        }
        let capacity = slot_capacity(geometry, policy, sample, num_threads);
        let assignments = partition_rows(geometry, &order, sample, num_threads, policy, capacity)?;
        let sample_stats = SampleBankStats::from_order(geometry, &order, sample)?;
        let max_slots_per_bank =
            SlotBankOccupancy::new(geometry, &assignments)?.max_slots_per_bank();

        let plan = RunPlan {
            order,
            assignments,
            slot_capacity: capacity,
            sample_stats,
            max_slots_per_bank,
        };
        info!(
            sampling = plan.sample_stats.sampling_fraction(),
            max_rows_per_bank = plan.sample_stats.max_rows_per_bank,
            avg_rows_per_bank = plan.sample_stats.avg_rows_per_bank,
            max_slots_per_bank,
            "partitioned sample"
        );
        debug!(rows_per_slot = ?plan.rows_per_slot(), capacity, "slot sizes");
        Ok(plan)
    }

    /// Executes `plan` over `buffer`, applying `operation` in every slot.
    pub fn execute<'a>(
        &self,
        plan: &RunPlan,
        buffer: &'a mut RowBuffer,
        operation: Operation<'a>,
    ) -> Result<RunReport, Error> {
        if buffer.geometry() != &self.config.geometry {
            return Err(Error::geometry_mismatch(
                self.config.geometry,
                *buffer.geometry(),
            ));
        }

        let mut slots = populate_slots(buffer, &plan.assignments, plan.slot_capacity)?;
        map_operation(&mut slots, operation);

        let start = Instant::now();
        run_slots(&mut slots, self.config.concurrency)?;
        let elapsed = start.elapsed();

        let mut per_slot = Vec::with_capacity(slots.len());
        reduce_slots(&slots, |count| per_slot.push(count));
        let total = total_count(&slots)?;
        info!(
            operation = operation.name(),
            total,
            elapsed_us = elapsed.as_micros() as u64,
            "run finished"
        );
        Ok(RunReport {
            total,
            per_slot,
            elapsed,
        })
    }
}
