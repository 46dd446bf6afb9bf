//! A small text workload for exercising the engine from the command line.
//!
//! The engine itself knows nothing about this: it only sees rows and
//! callbacks. Here, a row is a container of fixed-size records, each of
//! which holds one line of text padded with NUL bytes. The first record that
//! starts with a NUL byte marks the end of a row's records.

use crate::error::Error;
use crate::memory::RowBuffer;
use std::cmp::Ordering;
use std::io::BufRead;

/// The size (in bytes) of a single record
pub const RECORD_BYTE_SIZE: usize = 256;

/// the text stored in a record (without the padding)
fn record_text(record: &[u8]) -> &[u8] {
    match record.iter().position(|&b| b == 0) {
        Some(end) => &record[..end],
        None => record,
    }
}

/// Iterates over the text of every record in `row`
pub fn records(row: &[u8]) -> impl Iterator<Item = &[u8]> {
    row.chunks_exact(RECORD_BYTE_SIZE)
        .take_while(|record| record[0] != 0)
        .map(record_text)
}

/// Fills the rows of `buffer` (in ascending row order) with the lines read
/// from `reader`.
///
/// Blank lines are skipped and lines longer than a record get truncated.
/// Loading stops once the reader is exhausted or every record is used.
/// Returns the number of records that were written.
pub fn load_text_records<R: BufRead>(buffer: &mut RowBuffer, reader: R) -> Result<usize, Error> {
    let geometry = *buffer.geometry();
    let records_per_row = geometry.row_byte_size() / RECORD_BYTE_SIZE;
    let capacity = records_per_row * geometry.row_count();
    if capacity == 0 {
        return Ok(0);
    }

    let bytes = buffer.as_mut_bytes();
    let mut n_written = 0;
    // records are raw bytes; the input doesn't have to be valid UTF-8
    for line in reader.split(b'\n') {
        let line = line?;
        let text = line.strip_suffix(b"\r").unwrap_or(&line);
        if text.is_empty() {
            continue;
        }
        let row = n_written / records_per_row;
        let start = geometry.row_offset(row) + (n_written % records_per_row) * RECORD_BYTE_SIZE;
        let record = &mut bytes[start..(start + RECORD_BYTE_SIZE)];
        let len = text.len().min(RECORD_BYTE_SIZE);
        record[..len].copy_from_slice(&text[..len]);
        record[len..].fill(0);

        n_written += 1;
        if n_written == capacity {
            break;
        }
    }
    Ok(n_written)
}

/// Counts the records of `row` that contain `needle`. Without a needle,
/// every record is counted.
pub fn count_matching(row: &[u8], needle: Option<&[u8]>) -> u64 {
    match needle {
        None => records(row).count() as u64,
        Some(needle) if needle.is_empty() => records(row).count() as u64,
        Some(needle) => records(row)
            .filter(|text| text.windows(needle.len()).any(|w| w == needle))
            .count() as u64,
    }
}

/// Upper-cases (ASCII only) the text of every record in `row`, returning
/// the number of records that were modified.
pub fn capitalize_records(row: &mut [u8]) -> u64 {
    let mut n_records = 0;
    for record in row.chunks_exact_mut(RECORD_BYTE_SIZE) {
        if record[0] == 0 {
            break;
        }
        for b in record.iter_mut().take_while(|b| **b != 0) {
            b.make_ascii_uppercase();
        }
        n_records += 1;
    }
    n_records
}

// rows without any records sort after every other row
fn compare_first_records(a: &[u8], b: &[u8]) -> Ordering {
    match (records(a).next(), records(b).next()) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Pairwise callback: swaps the contents of `a` and `b` when the first
/// record of `a` sorts after the first record of `b`.
pub fn order_rows_by_first_record(a: &mut [u8], b: &mut [u8]) {
    if compare_first_records(a, b) == Ordering::Greater {
        a.swap_with_slice(b);
    }
}

/// whether consecutive rows are ordered by their first record
pub fn is_sorted_by_first_record<'a>(rows: impl IntoIterator<Item = &'a [u8]>) -> bool {
    let mut rows = rows.into_iter();
    let Some(mut prev) = rows.next() else {
        return true;
    };
    for row in rows {
        if compare_first_records(prev, row) == Ordering::Greater {
            return false;
        }
        prev = row;
    }
    true
}
