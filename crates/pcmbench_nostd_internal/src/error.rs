// The public crate wraps this type inside of its own Error type. We keep this
// one free of `std` (and of any allocation) so that it can live here.

/// Errors produced while configuring the geometry or partitioning rows.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// An integer parameter lies outside of its acceptable range
    IntegerRange {
        description: &'static str,
        actual: usize,
        min_val: usize,
        max_val: usize,
    },
    /// The sample asks for more rows than the shuffled order holds
    SampleTooLarge { sample: usize, available: usize },
    /// A row index doesn't belong to the geometry
    RowOutOfRange { row: usize, row_count: usize },
    /// A slot would need to hold more rows than its capacity allows
    SlotCapacity {
        slot: usize,
        capacity: usize,
    },
}

impl InternalError {
    pub(crate) fn integer_range(
        description: &'static str,
        actual: usize,
        min_val: usize,
        max_val: usize,
    ) -> Self {
        InternalError::IntegerRange {
            description,
            actual,
            min_val,
            max_val,
        }
    }
}

impl core::fmt::Display for InternalError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            InternalError::IntegerRange {
                description,
                actual,
                min_val,
                max_val,
            } => write!(
                f,
                "{description} has a value of {actual}. The value should be no \
                 less than {min_val} and not exceed {max_val}"
            ),
            InternalError::SampleTooLarge { sample, available } => write!(
                f,
                "a sample of {sample} rows was requested, but only {available} \
                 rows are available"
            ),
            InternalError::RowOutOfRange { row, row_count } => {
                write!(f, "row {row} lies outside of [0, {row_count})")
            }
            InternalError::SlotCapacity { slot, capacity } => write!(
                f,
                "slot {slot} can hold at most {capacity} rows; assigning \
                 another row would overrun it"
            ),
        }
    }
}

impl core::error::Error for InternalError {}
