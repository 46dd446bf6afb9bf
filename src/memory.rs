//! Ownership of the memory array that backs every row.
//!
//! The engine never interprets row contents. It only needs to hand each
//! worker slot exclusive access to the rows it was assigned. We get that for
//! free from the borrow checker: [`RowTable`] splits the buffer into one
//! `&mut [u8]` per row, and each row can be taken out of the table at most
//! once. Consequently, two slots can never alias the same row.

use crate::error::Error;
use pcmbench_nostd_internal::Geometry;

/// Caller-owned buffer of `geometry.total_bytes()` bytes
pub struct RowBuffer {
    geometry: Geometry,
    data: Vec<u8>,
}

impl RowBuffer {
    /// Allocates a zero-filled buffer for `geometry`.
    ///
    /// Failure to reserve the memory is reported as an error rather than
    /// aborting the process.
    pub fn new(geometry: Geometry) -> Result<Self, Error> {
        let total_bytes = geometry.total_bytes();
        let mut data: Vec<u8> = Vec::new();
        data.try_reserve_exact(total_bytes)
            .map_err(|_| Error::allocation("the row buffer", total_bytes))?;
        data.resize(total_bytes, 0);
        Ok(Self { geometry, data })
    }

    /// Wraps an existing allocation. `data` must hold exactly
    /// `geometry.total_bytes()` bytes.
    pub fn from_vec(geometry: Geometry, data: Vec<u8>) -> Result<Self, Error> {
        if data.len() != geometry.total_bytes() {
            Err(Error::buffer_size(geometry.total_bytes(), data.len()))
        } else {
            Ok(Self { geometry, data })
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The address that all row addresses are measured from
    pub fn base_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// panics if `r` is out of range
    pub fn row(&self, r: usize) -> &[u8] {
        let start = self.geometry.row_offset(r);
        &self.data[start..(start + self.geometry.row_byte_size())]
    }

    /// panics if `r` is out of range
    pub fn row_mut(&mut self, r: usize) -> &mut [u8] {
        let start = self.geometry.row_offset(r);
        let end = start + self.geometry.row_byte_size();
        &mut self.data[start..end]
    }

    /// Splits the buffer into individually borrowable rows
    pub fn rows_mut(&mut self) -> RowTable<'_> {
        let row_byte_size = self.geometry.row_byte_size();
        let rows = self
            .data
            .chunks_exact_mut(row_byte_size)
            .enumerate()
            .map(|(index, data)| Some(RowRef { index, data }))
            .collect();
        RowTable { rows }
    }
}

/// Exclusive access to a single row, along with its index
pub struct RowRef<'a> {
    index: usize,
    data: &'a mut [u8],
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bytes(&self) -> &[u8] {
        &*self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Address of the row's first byte
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }
}

/// Every row of a [`RowBuffer`], each of which can be taken exactly once
pub struct RowTable<'a> {
    rows: Vec<Option<RowRef<'a>>>,
}

impl<'a> RowTable<'a> {
    /// Removes row `r` from the table.
    ///
    /// Asking for a row a second time is an error: it would mean that 2 slots
    /// share a row.
    pub fn take(&mut self, r: usize) -> Result<RowRef<'a>, Error> {
        let row_count = self.rows.len();
        match self.rows.get_mut(r) {
            None => Err(pcmbench_nostd_internal::InternalError::RowOutOfRange {
                row: r,
                row_count,
            }
            .into()),
            Some(entry) => entry.take().ok_or_else(|| Error::duplicate_row(r)),
        }
    }

    /// the number of rows that haven't been taken yet
    pub fn remaining(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }
}
