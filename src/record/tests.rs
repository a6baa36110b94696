use super::core::*;
use crate::sort::{EngineConfig, SortError, SortKey, sort_records};

fn limits() -> IntakeLimits {
    IntakeLimits::default()
}

fn parse(input: &str) -> Result<RecordBatch, RecordError> {
    parse_batch(input.as_bytes(), &limits())
}

const SAMPLE: &str = "\
5
fileA.txt 101 2023-10-01T14:30:00
fileB.txt 102 2023-10-01T12:15:00
fileC.txt 103 2023-09-29T09:45:00
fileD.txt 104 2023-10-02T17:05:00
fileE.txt 105 2023-09-30T10:20:00
Timestamp
";

#[test]
fn test_parse_sample_batch() {
    let batch = parse(SAMPLE).unwrap();
    assert_eq!(batch.key, SortKey::Timestamp);
    assert_eq!(batch.records.len(), 5);
    assert_eq!(
        batch.records[0],
        Record::new("fileA.txt", 101, "2023-10-01T14:30:00")
    );
    assert_eq!(batch.records[4].id, 105);
}

#[test]
fn test_parse_crlf_and_blank_lines() {
    let input = "2\r\n\r\nbob.txt 3 2023-01-01T00:00:00\r\n   \r\nann.txt 1 2023-01-02T00:00:00\r\nName";
    let batch = parse(input).unwrap();
    assert_eq!(batch.key, SortKey::Name);
    assert_eq!(batch.records[1].name, "ann.txt");
    assert_eq!(batch.records[1].timestamp, "2023-01-02T00:00:00");
}

#[test]
fn test_parse_zero_records() {
    let batch = parse("0\nID\n").unwrap();
    assert!(batch.records.is_empty());
    assert_eq!(batch.key, SortKey::Id);
}

#[test]
fn test_parse_negative_id() {
    let batch = parse("1\nx.txt -42 2023-01-01T00:00:00\nID\n").unwrap();
    assert_eq!(batch.records[0].id, -42);
}

#[test]
fn test_count_over_limit_is_rejected_before_records() {
    let lim = IntakeLimits {
        max_records: 2,
        max_name_len: 128,
    };
    // records after the count are garbage; the limit fires first
    let err = parse_batch(b"3\ngarbage\n", &lim).unwrap_err();
    assert!(matches!(
        err,
        RecordError::Config(SortError::TooManyRecords { count: 3, limit: 2 })
    ));
    assert!(err.is_user_error());
}

#[test]
fn test_invalid_column() {
    let err = parse("1\na.txt 1 2023-01-01T00:00:00\nSize\n").unwrap_err();
    assert!(matches!(err, RecordError::Config(SortError::InvalidColumn(ref c)) if c == "Size"));
    assert_eq!(err.to_string(), "invalid sort column 'Size'");
}

#[test]
fn test_missing_pieces() {
    assert!(matches!(parse(""), Err(RecordError::MissingCount)));
    assert!(matches!(parse("   \n\n"), Err(RecordError::MissingCount)));
    assert!(matches!(
        parse("abc\n"),
        Err(RecordError::InvalidCount { line: 1, .. })
    ));
    assert!(matches!(
        parse("-1\n"),
        Err(RecordError::InvalidCount { .. })
    ));
    assert!(matches!(
        parse("2\na.txt 1 2023-01-01T00:00:00\n"),
        Err(RecordError::Truncated {
            expected: 2,
            found: 1
        })
    ));
    assert!(matches!(
        parse("1\na.txt 1 2023-01-01T00:00:00\n"),
        Err(RecordError::MissingColumn)
    ));
}

#[test]
fn test_malformed_record_lines() {
    assert!(matches!(
        parse("1\na.txt 1\nName\n"),
        Err(RecordError::MissingField {
            line: 2,
            field: "timestamp"
        })
    ));
    assert!(matches!(
        parse("1\na.txt 1 2023-01-01T00:00:00 extra\nName\n"),
        Err(RecordError::TrailingField { line: 2, .. })
    ));
    assert!(matches!(
        parse("1\na.txt one 2023-01-01T00:00:00\nName\n"),
        Err(RecordError::InvalidId { line: 2, .. })
    ));
    assert!(matches!(
        parse("1\na.txt 1 2023-01-01 00:00:00\nName\n"),
        Err(RecordError::TrailingField { .. })
    ));
    assert!(matches!(
        parse("1\na.txt 1 2023/01/01T00:00:00\nName\n"),
        Err(RecordError::InvalidTimestamp { line: 2, .. })
    ));
}

#[test]
fn test_name_limits() {
    let lim = IntakeLimits {
        max_records: 10,
        max_name_len: 4,
    };
    let err = parse_batch(b"1\nlonger 1 2023-01-01T00:00:00\nName\n", &lim).unwrap_err();
    assert!(matches!(
        err,
        RecordError::NameTooLong {
            len: 6,
            limit: 4,
            ..
        }
    ));
    let err = parse("1\na\u{7f}b 1 2023-01-01T00:00:00\nName\n").unwrap_err();
    assert!(matches!(err, RecordError::NonPrintableName { line: 2 }));
}

#[test]
fn test_invalid_utf8() {
    let err = parse_batch(b"1\n\xff\xfe 1 2023-01-01T00:00:00\nName\n", &limits()).unwrap_err();
    assert!(matches!(err, RecordError::Utf8 { line: 2 }));
}

#[test]
fn test_timestamp_validation() {
    assert!(is_valid_timestamp(b"2023-10-01T14:30:00"));
    assert!(is_valid_timestamp(b"2024-12-31T23:59:59"));
    assert!(!is_valid_timestamp(b"2023-10-01T14:30"));
    assert!(!is_valid_timestamp(b"2023-13-01T14:30:00"));
    assert!(!is_valid_timestamp(b"2023-00-01T14:30:00"));
    assert!(!is_valid_timestamp(b"2023-10-32T14:30:00"));
    assert!(!is_valid_timestamp(b"2023-10-01T24:00:00"));
    assert!(!is_valid_timestamp(b"2023-10-01T14:60:00"));
    assert!(!is_valid_timestamp(b"2023-10-01 14:30:00"));
    assert!(!is_valid_timestamp(b"2023-1a-01T14:30:00"));
}

#[test]
fn test_write_batch_format() {
    let records = vec![
        Record::new("ann.txt", 1, "2023-01-02T00:00:00"),
        Record::new("bob.txt", -3, "2023-01-01T00:00:00"),
    ];
    let mut out = Vec::new();
    write_batch(&mut out, SortKey::Id, &records).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "ID\nann.txt 1 2023-01-02T00:00:00\nbob.txt -3 2023-01-01T00:00:00\n"
    );
}

#[test]
fn test_write_empty_batch() {
    let mut out = Vec::new();
    write_batch(&mut out, SortKey::Name, &[]).unwrap();
    assert_eq!(out, b"Name\n");
}

#[test]
fn test_intake_limits_from_config() {
    let config = EngineConfig::default()
        .with_max_records(7)
        .with_max_name_len(9);
    let lim = IntakeLimits::from(&config);
    assert_eq!(lim.max_records, 7);
    assert_eq!(lim.max_name_len, 9);
}

#[test]
fn test_parse_sort_write_end_to_end() {
    let batch = parse(SAMPLE).unwrap();
    let outcome = sort_records(batch.records, batch.key, &EngineConfig::default()).unwrap();
    let mut out = Vec::new();
    write_batch(&mut out, batch.key, &outcome.records).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "\
Timestamp
fileC.txt 103 2023-09-29T09:45:00
fileE.txt 105 2023-09-30T10:20:00
fileB.txt 102 2023-10-01T12:15:00
fileA.txt 101 2023-10-01T14:30:00
fileD.txt 104 2023-10-02T17:05:00
"
    );
}

#[test]
fn test_output_reparses_to_same_records() {
    let batch = parse(SAMPLE).unwrap();
    let mut out = Vec::new();
    // the output format has no count line; prepend one to read it back
    out.extend_from_slice(format!("{}\n", batch.records.len()).as_bytes());
    let mut body = Vec::new();
    write_batch(&mut body, batch.key, &batch.records).unwrap();
    let text = String::from_utf8(body).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    let key_line = lines.remove(0);
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(key_line.as_bytes());
    let again = parse_batch(&out, &limits()).unwrap();
    assert_eq!(again, batch);
}
