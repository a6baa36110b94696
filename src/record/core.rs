/// Record intake and output for the text batch format.
///
/// Input layout, one item per line (blank lines are ignored):
/// ```text
/// 3
/// fileA.txt 101 2023-10-01T14:30:00
/// fileB.txt 102 2023-10-01T12:15:00
/// fileC.txt 103 2023-09-29T09:45:00
/// Timestamp
/// ```
/// Output is the selector line followed by the records in sorted order, in
/// the same `name id timestamp` shape.
use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;

use crate::sort::{SortError, SortKey};

/// Length of a `YYYY-MM-DDTHH:MM:SS` timestamp.
pub const TIMESTAMP_LEN: usize = 19;

/// 256KB output buffer; a full batch is a few MB at most.
const OUTPUT_BUF_SIZE: usize = 256 * 1024;

/// One `name id timestamp` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub name: String,
    pub id: i64,
    pub timestamp: String,
}

impl Record {
    pub fn new(name: impl Into<String>, id: i64, timestamp: impl Into<String>) -> Self {
        Record {
            name: name.into(),
            id,
            timestamp: timestamp.into(),
        }
    }
}

/// Limits applied while reading a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub max_records: usize,
    pub max_name_len: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        IntakeLimits {
            max_records: crate::sort::DEFAULT_MAX_RECORDS,
            max_name_len: crate::sort::DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl From<&crate::sort::EngineConfig> for IntakeLimits {
    fn from(config: &crate::sort::EngineConfig) -> Self {
        IntakeLimits {
            max_records: config.max_records,
            max_name_len: config.max_name_len,
        }
    }
}

/// A parsed input: the records and the requested key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub key: SortKey,
}

#[derive(Debug, Error)]
/// Errors raised while reading a batch.
pub enum RecordError {
    /// Count over the limit or unknown selector.
    #[error(transparent)]
    Config(#[from] SortError),
    #[error("missing record count")]
    MissingCount,
    #[error("line {line}: invalid record count '{value}'")]
    InvalidCount { line: usize, value: String },
    #[error("expected {expected} records, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("line {line}: expected 'name id timestamp', missing {field}")]
    MissingField { line: usize, field: &'static str },
    #[error("line {line}: unexpected extra field '{value}'")]
    TrailingField { line: usize, value: String },
    #[error("line {line}: invalid id '{value}'")]
    InvalidId { line: usize, value: String },
    #[error("line {line}: name is {len} bytes, limit is {limit}")]
    NameTooLong { line: usize, len: usize, limit: usize },
    #[error("line {line}: name contains non-printable characters")]
    NonPrintableName { line: usize },
    #[error("line {line}: invalid timestamp '{value}', expected YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp { line: usize, value: String },
    #[error("missing sort column")]
    MissingColumn,
    #[error("line {line}: input is not valid UTF-8")]
    Utf8 { line: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RecordError {
    /// Input problems are user errors; only I/O failures are not.
    pub fn is_user_error(&self) -> bool {
        match self {
            RecordError::Config(e) => e.is_user_error(),
            RecordError::Io(_) => false,
            _ => true,
        }
    }
}

/// Non-blank lines of `data` with their 1-based line numbers, CR stripped.
fn content_lines(data: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    let mut start = 0usize;
    let mut bounds = Vec::new();
    for pos in memchr::memchr_iter(b'\n', data) {
        bounds.push((start, pos));
        start = pos + 1;
    }
    if start < data.len() {
        bounds.push((start, data.len()));
    }

    bounds
        .into_iter()
        .enumerate()
        .map(move |(i, (s, mut e))| {
            if e > s && data[e - 1] == b'\r' {
                e -= 1;
            }
            (i + 1, &data[s..e])
        })
        .filter(|(_, line)| !line.iter().all(|b| b.is_ascii_whitespace()))
}

fn line_str(line: &[u8], number: usize) -> Result<&str, RecordError> {
    std::str::from_utf8(line).map_err(|_| RecordError::Utf8 { line: number })
}

/// True for a well-formed `YYYY-MM-DDTHH:MM:SS` timestamp.
pub fn is_valid_timestamp(ts: &[u8]) -> bool {
    if ts.len() != TIMESTAMP_LEN {
        return false;
    }
    for (i, &b) in ts.iter().enumerate() {
        let ok = match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 | 16 => b == b':',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return false;
        }
    }
    let two = |at: usize| (ts[at] - b'0') as u32 * 10 + (ts[at + 1] - b'0') as u32;
    let (month, day, hour, minute, second) = (two(5), two(8), two(11), two(14), two(17));
    (1..=12).contains(&month)
        && (1..=31).contains(&day)
        && hour < 24
        && minute < 60
        && second < 60
}

/// Parse one `name id timestamp` line.
pub fn parse_record(line: &str, number: usize, max_name_len: usize) -> Result<Record, RecordError> {
    let mut fields = line.split_ascii_whitespace();
    let name = fields.next().ok_or(RecordError::MissingField {
        line: number,
        field: "name",
    })?;
    let id = fields.next().ok_or(RecordError::MissingField {
        line: number,
        field: "id",
    })?;
    let timestamp = fields.next().ok_or(RecordError::MissingField {
        line: number,
        field: "timestamp",
    })?;
    if let Some(extra) = fields.next() {
        return Err(RecordError::TrailingField {
            line: number,
            value: extra.to_string(),
        });
    }

    if name.len() > max_name_len {
        return Err(RecordError::NameTooLong {
            line: number,
            len: name.len(),
            limit: max_name_len,
        });
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(RecordError::NonPrintableName { line: number });
    }
    let id: i64 = id.parse().map_err(|_| RecordError::InvalidId {
        line: number,
        value: id.to_string(),
    })?;
    if !is_valid_timestamp(timestamp.as_bytes()) {
        return Err(RecordError::InvalidTimestamp {
            line: number,
            value: timestamp.to_string(),
        });
    }

    Ok(Record::new(name, id, timestamp))
}

/// Parse a whole batch: count, records, then the selector token.
///
/// The count limit is checked before any record is read, and the selector
/// after all of them, so the first reported problem is the earliest one.
pub fn parse_batch(data: &[u8], limits: &IntakeLimits) -> Result<RecordBatch, RecordError> {
    let mut lines = content_lines(data);

    let (number, count_line) = lines.next().ok_or(RecordError::MissingCount)?;
    let count_str = line_str(count_line, number)?.trim();
    let count: usize = count_str.parse().map_err(|_| RecordError::InvalidCount {
        line: number,
        value: count_str.to_string(),
    })?;
    if count > limits.max_records {
        return Err(SortError::TooManyRecords {
            count,
            limit: limits.max_records,
        }
        .into());
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let Some((number, line)) = lines.next() else {
            return Err(RecordError::Truncated {
                expected: count,
                found: records.len(),
            });
        };
        let line = line_str(line, number)?;
        records.push(parse_record(line, number, limits.max_name_len)?);
    }

    let (number, column_line) = lines.next().ok_or(RecordError::MissingColumn)?;
    let key = SortKey::from_str(line_str(column_line, number)?.trim())?;

    Ok(RecordBatch { records, key })
}

/// Write one record as `name id timestamp\n`.
#[inline]
fn write_record(out: &mut impl Write, record: &Record, ids: &mut itoa::Buffer) -> io::Result<()> {
    out.write_all(record.name.as_bytes())?;
    out.write_all(b" ")?;
    out.write_all(ids.format(record.id).as_bytes())?;
    out.write_all(b" ")?;
    out.write_all(record.timestamp.as_bytes())?;
    out.write_all(b"\n")
}

/// Write the selector line and every record.
pub fn write_batch(out: &mut impl Write, key: SortKey, records: &[Record]) -> io::Result<()> {
    let mut writer = io::BufWriter::with_capacity(OUTPUT_BUF_SIZE, out);
    writer.write_all(key.token().as_bytes())?;
    writer.write_all(b"\n")?;
    let mut ids = itoa::Buffer::new();
    for record in records {
        write_record(&mut writer, record, &mut ids)?;
    }
    writer.flush()
}
