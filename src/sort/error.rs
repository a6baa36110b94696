//! Errors reported by the sort engine.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by [`SortEngine`](super::SortEngine) and its components.
pub enum SortError {
    /// More records than the configured maximum.
    #[error("exceeded number of records limit: got {count}, keep it at or below {limit}")]
    TooManyRecords { count: usize, limit: usize },
    /// Selector token is not one of `Name`, `ID`, `Timestamp`.
    #[error("invalid sort column '{0}'")]
    InvalidColumn(String),
    /// A tunable is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The partitioner was asked to split nothing, or across no workers.
    #[error("cannot partition {records} records across {workers} workers with partition size {hint}")]
    Partition {
        records: usize,
        workers: usize,
        hint: usize,
    },
    /// Worker threads could not be started.
    #[error("failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// A partition, histogram or combine buffer could not be allocated.
    #[error("memory allocation failed for {what}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    /// A worker panicked while holding the shared histogram lock.
    #[error("shared histogram lock poisoned")]
    LockPoisoned,
    /// A record hashed to a bucket the shared histogram never counted.
    #[error("histogram has no remaining slot for bucket {bucket}")]
    HistogramMismatch { bucket: usize },
}

impl SortError {
    /// Errors caused by the caller's input or flags, reported before any sorting.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SortError::TooManyRecords { .. } | SortError::InvalidColumn(_) | SortError::Config(_)
        )
    }

    pub(crate) fn alloc(what: &'static str) -> impl FnOnce(TryReserveError) -> SortError {
        move |source| SortError::Allocation { what, source }
    }
}
