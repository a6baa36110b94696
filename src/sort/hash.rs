/// Key hashing for the counting-sort path.
///
/// Every function maps a field to a bucket in `[0, range)`. The name and
/// timestamp folds are approximations of the true order:
/// - names only look at the first three characters, lowercase letters only;
/// - timestamps treat every month as 31 days and only years 2023-2024 fit
///   inside the default range without wrapping.
///
/// Records that share a bucket keep their input order in the final output
/// (see `combine::histogram_decode`), they are never re-compared.
use super::key::SortKey;
use crate::record::Record;

/// Two years of per-second resolution.
pub const DEFAULT_BUCKET_RANGE: usize = 63_072_000;

/// Number of name sections, one per lowercase starting letter.
pub const NAME_SECTIONS: usize = 26;

const ALPHABET: u64 = 26;
const EPOCH_YEAR: i64 = 2023;
const SECS_PER_DAY: i64 = 24 * 60 * 60;
const SECS_PER_MONTH: i64 = 31 * SECS_PER_DAY;
const SECS_PER_YEAR: i64 = 12 * SECS_PER_MONTH;

/// Alphabetic rank of a lowercase letter; anything else ranks 0.
#[inline]
fn alpha_rank(b: u8) -> u64 {
    if b.is_ascii_lowercase() {
        (b - b'a') as u64
    } else {
        0
    }
}

/// Bucket for a name: section by first letter, offset by the next two.
pub fn hash_name(name: &[u8], range: usize) -> usize {
    let section = (range / NAME_SECTIONS) as u64;
    let first = name.first().copied().map_or(0, alpha_rank);
    let base = first * section;

    let mut offset = 0u64;
    for &b in name.iter().skip(1).take(2) {
        offset = offset * ALPHABET + alpha_rank(b);
    }
    let offset = offset * section / (ALPHABET * ALPHABET);

    (base + offset) as usize
}

/// Bucket for an id, non-negative even for negative ids.
#[inline]
pub fn hash_id(id: i64, range: usize) -> usize {
    id.rem_euclid(range as i64) as usize
}

#[inline]
fn decimal(digits: &[u8]) -> i64 {
    digits
        .iter()
        .fold(0i64, |acc, &d| acc * 10 + (d.wrapping_sub(b'0') as i64))
}

/// Approximate seconds since 2023-01-01T00:00:00, reduced into the range.
///
/// Expects the `YYYY-MM-DDTHH:MM:SS` layout; intake validates it.
pub fn hash_timestamp(ts: &[u8], range: usize) -> usize {
    if ts.len() < 19 {
        return 0;
    }
    let year = decimal(&ts[0..4]) - EPOCH_YEAR;
    let month = decimal(&ts[5..7]);
    let day = decimal(&ts[8..10]);
    let hour = decimal(&ts[11..13]);
    let minute = decimal(&ts[14..16]);
    let second = decimal(&ts[17..19]);

    let secs = year * SECS_PER_YEAR
        + (month - 1) * SECS_PER_MONTH
        + (day - 1) * SECS_PER_DAY
        + hour * 3600
        + minute * 60
        + second;
    secs.rem_euclid(range as i64) as usize
}

/// Maps records to buckets for one key column and one bucket range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHasher {
    key: SortKey,
    range: usize,
}

impl KeyHasher {
    pub fn new(key: SortKey, range: usize) -> Self {
        KeyHasher { key, range }
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    pub fn range(&self) -> usize {
        self.range
    }

    #[inline]
    pub fn bucket(&self, record: &Record) -> usize {
        match self.key {
            SortKey::Name => hash_name(record.name.as_bytes(), self.range),
            SortKey::Id => hash_id(record.id, self.range),
            SortKey::Timestamp => hash_timestamp(record.timestamp.as_bytes(), self.range),
        }
    }
}
