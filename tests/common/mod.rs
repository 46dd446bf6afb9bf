// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use pcmbench::{Geometry, RowBuffer};

/// Writes `key` (little-endian) into the first 8 bytes of every row.
///
/// Rows must hold at least 8 bytes.
pub fn write_keys(buffer: &mut RowBuffer, keys: &[u64]) {
    assert_eq!(keys.len(), buffer.geometry().row_count());
    for (r, key) in keys.iter().enumerate() {
        buffer.row_mut(r)[..8].copy_from_slice(&key.to_le_bytes());
    }
}

pub fn read_key(row: &[u8]) -> u64 {
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&row[..8]);
    u64::from_le_bytes(bytes)
}

/// Pairwise callback that swaps 2 rows when their keys are out of order
pub fn swap_if_out_of_order(a: &mut [u8], b: &mut [u8]) {
    if read_key(a) > read_key(b) {
        a.swap_with_slice(b);
    }
}

/// a geometry whose rows are just large enough to hold a key
pub fn key_geometry(bank_count: usize, rows_per_bank: usize) -> Geometry {
    Geometry::with_row_byte_size(bank_count, rows_per_bank, 8).unwrap()
}
