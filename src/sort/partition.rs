/// Splitting a record batch into per-worker partitions.
///
/// The number of active partitions is `min(workers, ceil(n / hint))`; sizes
/// differ by at most one, with the extra elements going to the leading
/// partitions. Records keep their relative order inside each partition.
use std::ops::Range;

use super::error::SortError;
use crate::record::Record;

/// One worker's exclusive copy of a contiguous window of the input.
#[derive(Debug)]
pub struct Partition {
    /// Position of this partition among its siblings.
    pub index: usize,
    /// Offset of the window in the full record sequence.
    pub start: usize,
    pub records: Vec<Record>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Window this partition covers in the full sequence.
    pub fn window(&self) -> Range<usize> {
        self.start..self.start + self.records.len()
    }
}

/// Number of partitions a batch of `n` records is split into.
#[inline]
pub fn active_partitions(n: usize, hint: usize, workers: usize) -> usize {
    workers.min(n.div_ceil(hint))
}

/// Compute contiguous, near-equal windows covering `0..n`.
pub fn plan_partitions(n: usize, hint: usize, workers: usize) -> Result<Vec<Range<usize>>, SortError> {
    if n == 0 || workers == 0 || hint == 0 {
        return Err(SortError::Partition {
            records: n,
            workers,
            hint,
        });
    }

    let active = active_partitions(n, hint, workers);
    let base = n / active;
    let extra = n % active;

    let mut windows = Vec::new();
    windows
        .try_reserve_exact(active)
        .map_err(SortError::alloc("partition table"))?;

    let mut pos = 0usize;
    for i in 0..active {
        let size = base + usize::from(i < extra);
        windows.push(pos..pos + size);
        pos += size;
    }
    debug_assert_eq!(pos, n);
    Ok(windows)
}

/// Copy each planned window of `records` into its own partition.
///
/// On allocation failure every partition built so far is dropped before the
/// error is returned.
pub fn split(records: &[Record], hint: usize, workers: usize) -> Result<Vec<Partition>, SortError> {
    let windows = plan_partitions(records.len(), hint, workers)?;

    let mut partitions = Vec::new();
    partitions
        .try_reserve_exact(windows.len())
        .map_err(SortError::alloc("partition table"))?;

    for (index, window) in windows.into_iter().enumerate() {
        let mut copy = Vec::new();
        copy.try_reserve_exact(window.len())
            .map_err(SortError::alloc("partition data"))?;
        copy.extend_from_slice(&records[window.clone()]);
        partitions.push(Partition {
            index,
            start: window.start,
            records: copy,
        });
    }
    Ok(partitions)
}
