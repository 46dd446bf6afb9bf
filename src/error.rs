// We keep separate error types in this crate and in the internal crate. The
// public Error wraps the internal one (rather than exposing it directly) so
// that we are free to reorganize the internal crate later.
//
// Every variant describes a fatal condition: the run is abandoned as soon as
// one of them comes up, since a partially executed run would produce a
// meaningless measurement.

use pcmbench_nostd_internal::{Geometry, InternalError};

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The kinds of failures that can abort a run
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// invalid geometry, sample size, thread count or partition
    #[error(transparent)]
    Config(#[from] InternalError),
    /// A slot was asked to hold more rows than its capacity
    #[error("slot {slot} can hold at most {capacity} rows; refusing to append another")]
    SlotCapacity { slot: usize, capacity: usize },
    /// A pairwise operation was mapped onto a slot with an odd number of rows
    #[error("slot {slot} holds {n_rows} rows, but pairwise operations need an even count")]
    OddPairwiseRows { slot: usize, n_rows: usize },
    /// The same row was assigned to more than one slot
    #[error("row {row} was assigned to more than one slot")]
    DuplicateRow { row: usize },
    /// The buffer doesn't match the geometry it is used with
    #[error("the buffer holds {actual} bytes, but the geometry needs {expected}")]
    BufferSize { expected: usize, actual: usize },
    /// The buffer was built for a different geometry than the run uses
    #[error("the buffer was built for {actual}, but the run needs {expected}")]
    GeometryMismatch { expected: Geometry, actual: Geometry },
    /// A count no longer fits in a `u64`
    #[error("the count overflowed while accumulating the result of slot {slot}")]
    CountOverflow { slot: usize },
    /// Memory for the buffer (or for the slots) couldn't be reserved
    #[error("unable to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },
    /// The cooperative model couldn't build its worker pool
    #[error("failed to build a pool of {num_threads} workers: {reason}")]
    ThreadPool { num_threads: usize, reason: String },
    /// A dedicated worker thread couldn't be started
    #[error("failed to spawn the worker thread for slot {slot}")]
    Spawn {
        slot: usize,
        source: std::io::Error,
    },
    /// A callback panicked inside of a worker
    #[error("the worker for slot {slot} panicked")]
    WorkerPanicked { slot: usize },
    /// Failure while loading workload records
    #[error("unable to read workload records")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn slot_capacity(slot: usize, capacity: usize) -> Self {
        ErrorKind::SlotCapacity { slot, capacity }.into()
    }

    pub(crate) fn odd_pairwise_rows(slot: usize, n_rows: usize) -> Self {
        ErrorKind::OddPairwiseRows { slot, n_rows }.into()
    }

    pub(crate) fn duplicate_row(row: usize) -> Self {
        ErrorKind::DuplicateRow { row }.into()
    }

    pub(crate) fn buffer_size(expected: usize, actual: usize) -> Self {
        ErrorKind::BufferSize { expected, actual }.into()
    }

    pub(crate) fn geometry_mismatch(expected: Geometry, actual: Geometry) -> Self {
        ErrorKind::GeometryMismatch { expected, actual }.into()
    }

    pub(crate) fn count_overflow(slot: usize) -> Self {
        ErrorKind::CountOverflow { slot }.into()
    }

    pub(crate) fn allocation(what: &'static str, bytes: usize) -> Self {
        ErrorKind::Allocation { what, bytes }.into()
    }

    pub(crate) fn thread_pool(num_threads: usize, reason: String) -> Self {
        ErrorKind::ThreadPool {
            num_threads,
            reason,
        }
        .into()
    }

    pub(crate) fn spawn(slot: usize, source: std::io::Error) -> Self {
        ErrorKind::Spawn { slot, source }.into()
    }

    pub(crate) fn worker_panicked(slot: usize) -> Self {
        ErrorKind::WorkerPanicked { slot }.into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        ErrorKind::Config(err).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::Io(err).into()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.kind, f)
    }
}
