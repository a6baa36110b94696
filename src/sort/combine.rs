/// Reassembling the full sorted sequence once every worker has joined.
///
/// Counting path: histogram decode over the original, unpartitioned records.
/// Merge path: copy sorted partitions back, then merge neighbouring runs
/// pairwise, round after round, until one run covers everything.
use std::fmt;

use super::error::SortError;
use super::hash::KeyHasher;
use super::histogram::BucketHistogram;
use super::key::SortKey;
use super::partition::Partition;
use super::pass::merge_runs;
use crate::record::Record;

/// One sorted run `[start, end)` inside the full record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBoundary {
    pub start: usize,
    pub end: usize,
}

impl ChunkBoundary {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ChunkBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Reorder `records` by bucket using the accumulated histogram.
///
/// Scanning from the last record to the first and filling each bucket from
/// its end keeps records that share a bucket in their input order.
pub fn histogram_decode(
    records: &mut [Record],
    histogram: BucketHistogram,
    hasher: KeyHasher,
) -> Result<(), SortError> {
    let n = records.len();
    let mut cumulative = histogram.into_cumulative();

    // dest[i] is the output slot of the record currently at i.
    let mut dest = Vec::new();
    dest.try_reserve_exact(n)
        .map_err(SortError::alloc("output positions"))?;
    dest.resize(n, 0usize);

    for i in (0..n).rev() {
        let bucket = hasher.bucket(&records[i]);
        dest[i] = cumulative.take_slot(bucket)?;
    }

    apply_permutation(records, &mut dest);
    Ok(())
}

/// Move `records[i]` to `records[dest[i]]` for every i, following cycles.
/// `dest` must be a permutation of `0..records.len()`; it ends as the identity.
fn apply_permutation(records: &mut [Record], dest: &mut [usize]) {
    for i in 0..records.len() {
        while dest[i] != i {
            let j = dest[i];
            records.swap(i, j);
            dest.swap(i, j);
        }
    }
}

/// Copy every sorted partition back into its window and free it.
/// Returns one chunk boundary per partition, in window order.
pub fn copy_back(
    records: &mut [Record],
    partitions: Vec<Partition>,
) -> Result<Vec<ChunkBoundary>, SortError> {
    let mut chunks = Vec::new();
    chunks
        .try_reserve_exact(partitions.len())
        .map_err(SortError::alloc("chunk boundaries"))?;
    for partition in partitions {
        let window = partition.window();
        chunks.push(ChunkBoundary {
            start: window.start,
            end: window.end,
        });
        for (slot, record) in records[window].iter_mut().zip(partition.records) {
            *slot = record;
        }
    }
    Ok(chunks)
}

/// Merge adjacent sorted runs pairwise until a single run remains.
///
/// Each round merges (0, 1), (2, 3), ... left to right; an odd trailing run is
/// carried into the next round untouched. Returns the final run, or `None`
/// when there were no runs at all.
pub fn tournament_merge(
    records: &mut [Record],
    mut chunks: Vec<ChunkBoundary>,
    key: SortKey,
) -> Result<Option<ChunkBoundary>, SortError> {
    let mut round = 0usize;
    while chunks.len() > 1 {
        let mut next = Vec::new();
        next.try_reserve_exact(chunks.len().div_ceil(2))
            .map_err(SortError::alloc("merge rounds"))?;
        for pair in chunks.chunks(2) {
            match *pair {
                [left, right] => {
                    debug_assert_eq!(left.end, right.start);
                    merge_runs(&mut records[left.start..right.end], left.len(), key)?;
                    next.push(ChunkBoundary {
                        start: left.start,
                        end: right.end,
                    });
                }
                [odd] => next.push(odd),
                _ => {}
            }
        }
        round += 1;
        tracing::trace!(round, runs = next.len(), "tournament round merged");
        chunks = next;
    }
    Ok(chunks.pop())
}
