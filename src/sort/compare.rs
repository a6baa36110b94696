/// Record comparison for the merge-sort path.
/// Timestamps are fixed-width and zero-padded, so byte order is chronological.
use std::cmp::Ordering;

use super::key::SortKey;
use crate::record::Record;

/// Total order over two records on one key column.
#[inline]
pub fn compare_records(a: &Record, b: &Record, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.as_bytes().cmp(b.name.as_bytes()),
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Timestamp => a.timestamp.as_bytes().cmp(b.timestamp.as_bytes()),
    }
}

/// Index of the first record that sorts before its predecessor, if any.
pub fn find_disorder(records: &[Record], key: SortKey) -> Option<usize> {
    records
        .windows(2)
        .position(|w| compare_records(&w[0], &w[1], key) == Ordering::Greater)
        .map(|i| i + 1)
}

/// True when `records` is non-decreasing on `key`.
pub fn is_sorted(records: &[Record], key: SortKey) -> bool {
    find_disorder(records, key).is_none()
}
