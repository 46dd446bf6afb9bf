//! Produces the order in which rows get sampled and grouped.
//!
//! The randomized policies draw from an injected [`rand::Rng`]. Callers that
//! want the historical "seed from the clock" behavior can get such a
//! generator from the `pcmbench` crate; tests just pass a seeded generator.

use crate::geometry::Geometry;
use alloc::vec::Vec;
use rand::Rng;

/// Selects how [`shuffle_rows`] orders the row indices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShufflePolicy {
    /// every position swaps with a uniformly random position (across all
    /// banks). No bank-locality structure survives.
    Uniform,
    /// every position swaps with a random position *inside of the same
    /// bank*. The bank sequence of the order is left untouched, only the
    /// order within each bank gets randomized.
    BankAware,
    /// no randomness at all: bank-major traversal, i.e. all rows of bank 0,
    /// then all rows of bank 1, and so on (see [`bank_grouped_order`])
    BankGrouped,
}

/// Returns a permutation of `0..geometry.row_count()` built according to
/// `policy`.
///
/// `rng` is ignored by [`ShufflePolicy::BankGrouped`].
pub fn shuffle_rows<R: Rng + ?Sized>(
    geometry: &Geometry,
    policy: ShufflePolicy,
    rng: &mut R,
) -> Vec<usize> {
    match policy {
        ShufflePolicy::Uniform => {
            let mut rows: Vec<usize> = (0..geometry.row_count()).collect();
            uniform_shuffle(&mut rows, rng);
            rows
        }
        ShufflePolicy::BankAware => {
            let mut rows: Vec<usize> = (0..geometry.row_count()).collect();
            bank_aware_shuffle(geometry, &mut rows, rng);
            rows
        }
        ShufflePolicy::BankGrouped => bank_grouped_order(geometry),
    }
}

// a single pass over the positions, where each position swaps with a random
// index drawn from the whole range. (This isn't the textbook Fisher-Yates
// bound, but every permutation is still reachable)
fn uniform_shuffle<R: Rng + ?Sized>(rows: &mut [usize], rng: &mut R) {
    let n = rows.len();
    for r in 0..n {
        let other = rng.random_range(0..n);
        rows.swap(r, other);
    }
}

// position `r` only ever swaps with another position of the same bank. Since
// we start from the identity permutation, `bank(rows[p]) == bank(p)` holds
// after every swap.
fn bank_aware_shuffle<R: Rng + ?Sized>(geometry: &Geometry, rows: &mut [usize], rng: &mut R) {
    let bank_count = geometry.bank_count();
    let rows_per_bank = geometry.rows_per_bank();
    for r in 0..rows.len() {
        let bank = geometry.bank(r);
        let offset_in_bank = rng.random_range(0..rows_per_bank);
        rows.swap(r, offset_in_bank * bank_count + bank);
    }
}

/// The deterministic bank-major order.
///
/// Entry `bank * rows_per_bank + r` holds the row `r * bank_count + bank`.
/// In other words, this transposes the row-major iteration order.
pub fn bank_grouped_order(geometry: &Geometry) -> Vec<usize> {
    let bank_count = geometry.bank_count();
    let rows_per_bank = geometry.rows_per_bank();
    let mut rows = alloc::vec![0; geometry.row_count()];
    for bank in 0..bank_count {
        for r in 0..rows_per_bank {
            rows[bank * rows_per_bank + r] = r * bank_count + bank;
        }
    }
    rows
}
