//! Describes the fixed shape of the bank-organized memory array.
//!
//! Rows are interleaved across banks: consecutive row indices round-robin
//! over the banks (`bank(r) = r % bank_count`), which models a striped
//! memory layout.

use crate::error::InternalError;

/// The largest supported number of banks
pub const MAX_BANKS: usize = 128;

/// The largest supported number of rows in a single bank
pub const MAX_ROWS_PER_BANK: usize = 8192;

/// The largest supported number of worker slots
pub const MAX_THREADS: usize = 1024;

/// The size (in bytes) of a row, unless a caller explicitly overrides it
pub const DEFAULT_ROW_BYTE_SIZE: usize = 4096;

/// The shape of the memory array.
///
/// Instances can only be built through [`Geometry::new`], which validates the
/// parameters. Afterwards, the shape never changes, so it's fine to share a
/// `Geometry` between any number of threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    bank_count: usize,
    rows_per_bank: usize,
    row_byte_size: usize,
}

impl Geometry {
    /// Build a geometry with rows of [`DEFAULT_ROW_BYTE_SIZE`] bytes
    pub fn new(bank_count: usize, rows_per_bank: usize) -> Result<Self, InternalError> {
        Self::with_row_byte_size(bank_count, rows_per_bank, DEFAULT_ROW_BYTE_SIZE)
    }

    pub fn with_row_byte_size(
        bank_count: usize,
        rows_per_bank: usize,
        row_byte_size: usize,
    ) -> Result<Self, InternalError> {
        // each bound is checked on its own. Exceeding either one is enough
        // to reject the configuration
        if bank_count == 0 || bank_count > MAX_BANKS {
            return Err(InternalError::integer_range(
                "bank_count",
                bank_count,
                1,
                MAX_BANKS,
            ));
        }
        if rows_per_bank == 0 || rows_per_bank > MAX_ROWS_PER_BANK {
            return Err(InternalError::integer_range(
                "rows_per_bank",
                rows_per_bank,
                1,
                MAX_ROWS_PER_BANK,
            ));
        }
        // bank_count * rows_per_bank can't overflow thanks to the above
        // checks, but the total byte count still can
        let max_row_byte_size = usize::MAX / (bank_count * rows_per_bank);
        if row_byte_size == 0 || row_byte_size > max_row_byte_size {
            return Err(InternalError::integer_range(
                "row_byte_size",
                row_byte_size,
                1,
                max_row_byte_size,
            ));
        }
        Ok(Self {
            bank_count,
            rows_per_bank,
            row_byte_size,
        })
    }

    pub fn bank_count(&self) -> usize {
        self.bank_count
    }

    pub fn rows_per_bank(&self) -> usize {
        self.rows_per_bank
    }

    /// The total number of rows. This is always `bank_count * rows_per_bank`
    pub fn row_count(&self) -> usize {
        self.bank_count * self.rows_per_bank
    }

    pub fn row_byte_size(&self) -> usize {
        self.row_byte_size
    }

    /// The number of bytes a buffer must have to back every row
    pub fn total_bytes(&self) -> usize {
        self.row_count() * self.row_byte_size
    }

    /// returns the bank that owns row `r`
    #[inline(always)]
    pub fn bank(&self, r: usize) -> usize {
        r % self.bank_count
    }

    /// Byte offset of row `r`, measured from the start of the buffer
    #[inline(always)]
    pub fn row_offset(&self, r: usize) -> usize {
        r * self.row_byte_size
    }

    /// The row that holds the byte at `offset`
    #[inline(always)]
    pub fn row_of_offset(&self, offset: usize) -> usize {
        offset / self.row_byte_size
    }

    /// Address of row `r` within the buffer that starts at `base`.
    ///
    /// This only does address arithmetic. The result is never dereferenced.
    #[inline(always)]
    pub fn row_ptr(&self, base: *const u8, r: usize) -> *const u8 {
        base.wrapping_add(self.row_offset(r))
    }

    /// The inverse of [`Geometry::row_ptr`]. `ptr` must not precede `base`.
    #[inline(always)]
    pub fn row_of(&self, base: *const u8, ptr: *const u8) -> usize {
        debug_assert!(ptr.addr() >= base.addr());
        self.row_of_offset(ptr.addr() - base.addr())
    }

    #[inline(always)]
    pub fn bank_of(&self, base: *const u8, ptr: *const u8) -> usize {
        self.bank(self.row_of(base, ptr))
    }

    pub fn check_row(&self, r: usize) -> Result<(), InternalError> {
        if r < self.row_count() {
            Ok(())
        } else {
            Err(InternalError::RowOutOfRange {
                row: r,
                row_count: self.row_count(),
            })
        }
    }
}

impl core::fmt::Display for Geometry {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} banks x {} rows of {} bytes",
            self.bank_count, self.rows_per_bank, self.row_byte_size
        )
    }
}
