//! Tests for the snapshot record state machine
//!
//! These tests verify:
//! - Header validation and version handling
//! - Checksum verification, skipping and absence
//! - Database selection and expiry records
//! - Every built-in value type
//! - Terminal failure behaviour

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use replwire::snapshot::{
    ChecksumStatus, Expiry, ExpiryUnit, RecordValue, SnapshotDecoder, SnapshotRecord, ValueType,
    OPCODE_EXPIRETIME, OPCODE_EXPIRETIME_MS,
};
use replwire::{Config, ErrorKind, StatsObserver, WireError};
use tempfile::NamedTempFile;

use super::SnapshotBuilder;

// =============================================================================
// Helper Functions
// =============================================================================

fn decoder(bytes: Vec<u8>) -> SnapshotDecoder<Cursor<Vec<u8>>> {
    SnapshotDecoder::new(Cursor::new(bytes))
}

fn decode_all(bytes: Vec<u8>) -> replwire::Result<Vec<SnapshotRecord>> {
    decoder(bytes).records().collect()
}

fn only_entry(bytes: Vec<u8>) -> SnapshotRecord {
    let mut records = decode_all(bytes).unwrap();
    assert_eq!(records.len(), 1);
    records.remove(0)
}

fn text(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

/// Snapshot with a spread of record types and no zero runs in the body
fn sample_snapshot() -> SnapshotBuilder {
    SnapshotBuilder::new("0006")
        .select_db(1)
        .string_entry(b"foo", b"bar")
        .raw(&[0x01])
        .string(b"queue")
        .length(2)
        .string(b"job-1")
        .string(b"job-2")
        .raw(&[OPCODE_EXPIRETIME_MS])
        .raw(&1_700_000_000_123u64.to_le_bytes())
        .string_entry(b"session", b"token")
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_empty_snapshot_skipped_checksum() {
    let mut decoder = decoder(SnapshotBuilder::new("0006").finish_unchecked());

    assert!(decoder.decode_next().unwrap().is_none());
    assert_eq!(decoder.version(), Some(6));
    assert_eq!(decoder.database(), None);
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Skipped);
    assert!(decoder.is_terminated());
    assert_eq!(decoder.bytes_consumed(), 18);
}

#[test]
fn test_read_header_explicitly() {
    let mut decoder = decoder(SnapshotBuilder::new("0007").finish_unchecked());
    assert_eq!(decoder.read_header().unwrap(), 7);
    assert_eq!(decoder.read_header().unwrap(), 7);
    assert!(decoder.decode_next().unwrap().is_none());
}

#[test]
fn test_bad_magic() {
    let err = decode_all(b"RADIS0006\xff".to_vec()).unwrap_err();
    assert!(matches!(err, WireError::Framing(_)));
}

#[test]
fn test_bad_version_digits() {
    let err = decode_all(b"REDIS00x6\xff".to_vec()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Framing);
}

#[test]
fn test_truncated_header() {
    let err = decode_all(b"REDI".to_vec()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);
}

// =============================================================================
// Checksum Tests
// =============================================================================

#[test]
fn test_valid_checksum_verified() {
    let mut decoder = decoder(sample_snapshot().finish());
    let records: Vec<_> = decoder.records().collect::<replwire::Result<_>>().unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Verified);
}

#[test]
fn test_corrupted_checksum_rejected() {
    let mut bytes = sample_snapshot().finish();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let err = decode_all(bytes).unwrap_err();
    assert!(matches!(err, WireError::ChecksumMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn test_any_body_bit_flip_fails() {
    let builder = sample_snapshot();
    let body_start = 9;
    let body_end = builder.body_len();
    let original = builder.finish();

    for index in body_start..body_end {
        for bit in 0..8 {
            let mut corrupted = original.clone();
            corrupted[index] ^= 1 << bit;
            assert!(
                decode_all(corrupted).is_err(),
                "flip of bit {} in byte {} went undetected",
                bit,
                index
            );
        }
    }
}

#[test]
fn test_old_version_has_no_checksum() {
    let bytes = SnapshotBuilder::new("0004")
        .string_entry(b"k", b"v")
        .finish_bare();
    let mut decoder = decoder(bytes);

    assert!(decoder.decode_next().unwrap().is_some());
    assert!(decoder.decode_next().unwrap().is_none());
    assert_eq!(decoder.checksum_status(), ChecksumStatus::NotPresent);
}

#[test]
fn test_checksum_threshold_configurable() {
    let config = Config::builder().checksum_min_version(7).build();
    let bytes = SnapshotBuilder::new("0006").finish_bare();
    let mut decoder = SnapshotDecoder::with_config(Cursor::new(bytes), config);

    assert!(decoder.decode_next().unwrap().is_none());
    assert_eq!(decoder.checksum_status(), ChecksumStatus::NotPresent);
}

#[test]
fn test_verification_disabled() {
    let mut bytes = sample_snapshot().finish();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let config = Config::builder().verify_checksum(false).build();
    let mut decoder = SnapshotDecoder::with_config(Cursor::new(bytes), config);
    while decoder.decode_next().unwrap().is_some() {}
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Skipped);
}

#[test]
fn test_missing_trailer_truncated() {
    let mut bytes = SnapshotBuilder::new("0006").finish_unchecked();
    bytes.truncate(bytes.len() - 3);
    assert_eq!(decode_all(bytes).unwrap_err().kind(), ErrorKind::Truncation);
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_select_db_tags_entries() {
    let bytes = SnapshotBuilder::new("0006")
        .select_db(0)
        .string_entry(b"a", b"1")
        .select_db(3)
        .string_entry(b"b", b"2")
        .finish();

    let mut decoder = decoder(bytes);
    assert_eq!(decoder.decode_next().unwrap(), Some(SnapshotRecord::SelectDb(0)));
    assert_eq!(decoder.decode_next().unwrap().unwrap().entry().unwrap().db, Some(0));
    assert_eq!(decoder.decode_next().unwrap(), Some(SnapshotRecord::SelectDb(3)));
    assert_eq!(decoder.database(), Some(3));

    let record = decoder.decode_next().unwrap().unwrap();
    let entry = record.entry().unwrap();
    assert_eq!(entry.db, Some(3));
    assert_eq!(entry.key, text("b"));
    assert_eq!(entry.value, RecordValue::String(text("2")));
}

#[test]
fn test_entry_before_select_has_no_db() {
    let record = only_entry(SnapshotBuilder::new("0006").string_entry(b"k", b"v").finish());
    assert_eq!(record.entry().unwrap().db, None);
    assert!(matches!(record, SnapshotRecord::PlainEntry(_)));
}

#[test]
fn test_expiry_seconds() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[OPCODE_EXPIRETIME])
        .raw(&1_700_000_000u32.to_le_bytes())
        .string_entry(b"k", b"v")
        .finish();

    let record = only_entry(bytes);
    let expiry = record.expiry().unwrap();
    assert_eq!(expiry.unit, ExpiryUnit::Seconds);
    assert_eq!(expiry.at, Duration::from_secs(1_700_000_000));
    assert_eq!(expiry.as_millis(), 1_700_000_000_000);
}

#[test]
fn test_expiry_milliseconds() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[OPCODE_EXPIRETIME_MS])
        .raw(&1_422_118_113_622u64.to_le_bytes())
        .string_entry(b"k", b"v")
        .finish();

    let SnapshotRecord::ExpiringEntry(expiry, entry) = only_entry(bytes) else {
        panic!("expected expiring entry");
    };
    assert_eq!(expiry.unit, ExpiryUnit::Milliseconds);
    assert_eq!(expiry.at, Duration::new(1_422_118_113, 622_000_000));
    assert_eq!(entry.key, text("k"));
}

#[test]
fn test_expiry_full_millisecond_range() {
    let expiry = Expiry::from_millis(u64::MAX);
    assert_eq!(expiry.at.as_secs(), 18_446_744_073_709_551);
    assert_eq!(expiry.at.subsec_nanos(), 615_000_000);
    assert_eq!(expiry.as_millis(), u64::MAX);
}

#[test]
fn test_expiry_comparison() {
    let expiry = Expiry::from_millis(1_000);
    assert!(expiry.is_expired_at(UNIX_EPOCH + Duration::from_secs(2)));
    assert!(!expiry.is_expired_at(UNIX_EPOCH));
    assert!(!Expiry::from_secs(u32::MAX).is_expired_at(SystemTime::UNIX_EPOCH));
}

#[test]
fn test_expiry_applies_to_one_entry() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[OPCODE_EXPIRETIME])
        .raw(&10u32.to_le_bytes())
        .string_entry(b"a", b"1")
        .string_entry(b"b", b"2")
        .finish();

    let records = decode_all(bytes).unwrap();
    assert!(records[0].expiry().is_some());
    assert!(records[1].expiry().is_none());
}

// =============================================================================
// Value Type Tests
// =============================================================================

#[test]
fn test_list_and_set() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x01])
        .string(b"list")
        .length(3)
        .string(b"a")
        .string(b"b")
        .raw(&[0xC0, 7])
        .raw(&[0x02])
        .string(b"set")
        .length(1)
        .string(b"m")
        .finish();

    let records = decode_all(bytes).unwrap();
    let list = records[0].entry().unwrap();
    assert_eq!(list.value_type, ValueType::List);
    assert_eq!(
        list.value,
        RecordValue::List(vec![text("a"), text("b"), text("7")])
    );

    let set = records[1].entry().unwrap();
    assert_eq!(set.value_type, ValueType::Set);
    assert_eq!(set.value, RecordValue::Set(vec![text("m")]));
}

#[test]
fn test_sorted_set() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x03])
        .string(b"scores")
        .length(2)
        .string(b"alice")
        .raw(b"\x043.25")
        .string(b"bob")
        .raw(&[254])
        .finish();

    let record = only_entry(bytes);
    assert_eq!(
        record.entry().unwrap().value,
        RecordValue::SortedSet(vec![(text("alice"), 3.25), (text("bob"), f64::INFINITY)])
    );
}

#[test]
fn test_hash() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x04])
        .string(b"user")
        .length(2)
        .string(b"name")
        .string(b"ann")
        .string(b"age")
        .raw(&[0xC0, 30])
        .finish();

    let record = only_entry(bytes);
    let entry = record.entry().unwrap();
    assert_eq!(entry.value_type, ValueType::Hash);
    assert_eq!(
        entry.value,
        RecordValue::Hash(vec![
            (text("name"), text("ann")),
            (text("age"), text("30")),
        ])
    );
    assert_eq!(entry.value.len(), 2);
}

#[test]
fn test_packed_encodings_surface_raw() {
    for tag in [9u8, 10, 11, 12, 13] {
        let bytes = SnapshotBuilder::new("0006")
            .raw(&[tag])
            .string(b"packed")
            .string(b"\x01\x02\x03")
            .finish();

        let record = only_entry(bytes);
        let entry = record.entry().unwrap();
        assert_eq!(entry.value_type, ValueType::from_tag(tag));
        assert_eq!(entry.value, RecordValue::Encoded(Bytes::from_static(b"\x01\x02\x03")));
    }
}

#[test]
fn test_compressed_value() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x00])
        .string(b"k")
        .raw(&[0xC4, 4, 8, 0x00, b'a', 0xA0, 0x00])
        .finish();

    let record = only_entry(bytes);
    assert_eq!(record.entry().unwrap().value, RecordValue::String(text("aaaaaaaa")));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_unknown_value_type() {
    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x07])
        .string(b"k")
        .finish();
    let mut decoder = decoder(bytes);

    let err = decoder.decode_next().unwrap_err();
    assert!(matches!(err, WireError::UnexpectedValueType(7)));
    assert!(matches!(decoder.decode_next(), Err(WireError::Aborted)));
    assert!(matches!(decoder.read_header(), Err(WireError::Aborted)));
}

#[test]
fn test_unexpected_length_marker_in_key() {
    let bytes = SnapshotBuilder::new("0006").raw(&[0x00, 0xC5]).finish();
    let err = decode_all(bytes).unwrap_err();
    assert!(matches!(err, WireError::UnexpectedLengthMarker(5)));
}

#[test]
fn test_truncated_entry() {
    // value declares 10 bytes, only one follows
    let input = SnapshotBuilder::new("0006")
        .raw(&[0x00])
        .string(b"key")
        .raw(&[0x0A, b'v'])
        .finish_bare();

    let err = decode_all(input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);
}

#[test]
fn test_end_of_stream_without_marker() {
    let bytes = SnapshotBuilder::new("0006").string_entry(b"k", b"v").finish_bare();
    let without_eof = bytes[..bytes.len() - 1].to_vec();

    let mut decoder = decoder(without_eof);
    assert!(decoder.decode_next().unwrap().is_some());
    assert_eq!(decoder.decode_next().unwrap_err().kind(), ErrorKind::Truncation);
}

#[test]
fn test_calls_after_termination() {
    let mut decoder = decoder(SnapshotBuilder::new("0006").finish());
    assert!(decoder.decode_next().unwrap().is_none());
    assert!(decoder.decode_next().unwrap().is_none());
    assert!(decoder.records().next().is_none());
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Verified);
}

#[test]
fn test_trailing_bytes_not_read() {
    let mut bytes = SnapshotBuilder::new("0006").finish();
    let snapshot_len = bytes.len() as u64;
    bytes.extend_from_slice(b"+CONTINUE\r\n");

    let mut decoder = decoder(bytes);
    assert!(decoder.decode_next().unwrap().is_none());
    assert_eq!(decoder.bytes_consumed(), snapshot_len);
}

// =============================================================================
// Source and Observer Tests
// =============================================================================

#[test]
fn test_decode_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&sample_snapshot().finish()).unwrap();
    file.flush().unwrap();

    let reader = std::fs::File::open(file.path()).unwrap();
    let mut decoder = SnapshotDecoder::new(reader);
    let records: Vec<_> = decoder.records().collect::<replwire::Result<_>>().unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[3].expiry(), Some(Expiry::from_millis(1_700_000_000_123)));
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Verified);
}

#[test]
fn test_small_read_buffer() {
    let config = Config::builder().read_buffer_size(1).build();
    let mut decoder = SnapshotDecoder::with_config(Cursor::new(sample_snapshot().finish()), config);
    let count = decoder.records().map(|r| r.unwrap()).count();
    assert_eq!(count, 4);
    assert_eq!(decoder.checksum_status(), ChecksumStatus::Verified);
}

#[test]
fn test_stats_observer() {
    let stats = Arc::new(StatsObserver::new());
    let mut decoder = decoder(sample_snapshot().finish()).with_observer(stats.clone());
    while decoder.decode_next().unwrap().is_some() {}

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.databases_selected, 1);
    assert_eq!(snapshot.entries, 3);
    assert_eq!(snapshot.expiring_entries, 1);
    assert_eq!(snapshot.checksum, Some(ChecksumStatus::Verified));
    assert_eq!(snapshot.failures, 0);
}

#[test]
fn test_stats_observer_counts_failure() {
    let stats = Arc::new(StatsObserver::new());
    let mut decoder = decoder(b"NOPE!0006".to_vec()).with_observer(stats.clone());
    assert!(decoder.decode_next().is_err());
    assert!(decoder.decode_next().is_err());
    assert_eq!(stats.snapshot().failures, 1);
}
