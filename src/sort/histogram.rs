/// Bucket histograms for the counting-sort path.
///
/// Only occupied buckets are stored, so a histogram over the full default
/// range costs memory proportional to the number of distinct buckets seen,
/// not to the range itself. Iteration is in ascending bucket order, which is
/// all the prefix-sum needs.
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::error::SortError;

/// Count of records per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketHistogram {
    counts: BTreeMap<usize, usize>,
}

impl BucketHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, bucket: usize) {
        *self.counts.entry(bucket).or_insert(0) += 1;
    }

    /// Add every count of `other` into `self`.
    pub fn absorb(&mut self, other: &BucketHistogram) {
        for (&bucket, &count) in &other.counts {
            *self.counts.entry(bucket).or_insert(0) += count;
        }
    }

    pub fn get(&self, bucket: usize) -> usize {
        self.counts.get(&bucket).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of occupied buckets.
    pub fn occupied(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Turn per-bucket counts into cumulative counts (records in buckets <= b).
    pub fn into_cumulative(self) -> CumulativeCounts {
        let mut running = 0usize;
        let mut ends = self.counts;
        for count in ends.values_mut() {
            running += *count;
            *count = running;
        }
        CumulativeCounts { ends }
    }
}

/// Prefix sums over a histogram: for each occupied bucket, one past the last
/// output slot its records occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeCounts {
    ends: BTreeMap<usize, usize>,
}

impl CumulativeCounts {
    pub fn end_of(&self, bucket: usize) -> Option<usize> {
        self.ends.get(&bucket).copied()
    }

    /// Claim the last free slot of `bucket`, moving its end down by one.
    #[inline]
    pub fn take_slot(&mut self, bucket: usize) -> Result<usize, SortError> {
        match self.ends.get_mut(&bucket) {
            Some(end) if *end > 0 => {
                *end -= 1;
                Ok(*end)
            }
            _ => Err(SortError::HistogramMismatch { bucket }),
        }
    }
}

/// The cross-worker histogram. Each worker folds its local histogram in
/// exactly once; the lock is held only for that addition.
#[derive(Debug, Default)]
pub struct SharedHistogram {
    inner: Mutex<BucketHistogram>,
}

impl SharedHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&self, local: &BucketHistogram) -> Result<(), SortError> {
        let mut shared = self.inner.lock().map_err(|_| SortError::LockPoisoned)?;
        shared.absorb(local);
        Ok(())
    }

    /// Take the accumulated histogram once every worker has joined.
    pub fn into_inner(self) -> Result<BucketHistogram, SortError> {
        self.inner.into_inner().map_err(|_| SortError::LockPoisoned)
    }
}
