/// Per-partition work, run on a worker thread.
///
/// Both passes run to completion without yielding. The counting pass only
/// reads its partition; the merge pass reorders it in place.
use std::cmp::Ordering;
use std::mem;

use super::compare::compare_records;
use super::error::SortError;
use super::hash::KeyHasher;
use super::histogram::{BucketHistogram, SharedHistogram};
use super::key::SortKey;
use crate::record::Record;

/// Count the partition's buckets locally, then fold them into `shared`.
/// Hashing happens before the lock is taken.
pub fn counting_pass(
    records: &[Record],
    hasher: KeyHasher,
    shared: &SharedHistogram,
) -> Result<BucketHistogram, SortError> {
    let mut local = BucketHistogram::new();
    for record in records {
        local.add(hasher.bucket(record));
    }
    shared.accumulate(&local)?;
    Ok(local)
}

/// Stable recursive merge sort of one partition.
pub fn merge_sort_pass(records: &mut [Record], key: SortKey) -> Result<(), SortError> {
    merge_sort(records, key)
}

fn merge_sort(run: &mut [Record], key: SortKey) -> Result<(), SortError> {
    if run.len() < 2 {
        return Ok(());
    }
    let mid = run.len().div_ceil(2);
    merge_sort(&mut run[..mid], key)?;
    merge_sort(&mut run[mid..], key)?;
    merge_runs(run, mid, key)
}

/// Merge the sorted runs `run[..mid]` and `run[mid..]` into one sorted run.
///
/// Ties go to the left run, so equal keys keep their relative order. Only
/// the left run is moved to scratch space; right-run records are swapped
/// forward into slots that are already vacated. The scratch space is
/// reserved before anything moves, so on failure `run` is left untouched.
pub fn merge_runs(run: &mut [Record], mid: usize, key: SortKey) -> Result<(), SortError> {
    if mid == 0 || mid >= run.len() {
        return Ok(());
    }
    // Already ordered across the seam.
    if compare_records(&run[mid - 1], &run[mid], key) != Ordering::Greater {
        return Ok(());
    }

    let mut left: Vec<Record> = Vec::new();
    left.try_reserve_exact(mid)
        .map_err(SortError::alloc("merge scratch"))?;
    left.extend(run[..mid].iter_mut().map(mem::take));
    let (mut i, mut j, mut k) = (0usize, mid, 0usize);

    while i < left.len() && j < run.len() {
        if compare_records(&left[i], &run[j], key) != Ordering::Greater {
            run[k] = mem::take(&mut left[i]);
            i += 1;
        } else {
            run.swap(k, j);
            j += 1;
        }
        k += 1;
    }
    while i < left.len() {
        run[k] = mem::take(&mut left[i]);
        i += 1;
        k += 1;
    }
    Ok(())
}
