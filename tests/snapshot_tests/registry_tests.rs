//! Tests for pluggable value decoders

use std::io::Cursor;

use bytes::Bytes;
use replwire::snapshot::{
    RecordRead, RecordValue, SnapshotDecoder, StringValue, ValueRegistry, ValueType,
};
use replwire::WireError;

use super::SnapshotBuilder;

#[test]
fn test_default_registry_tags() {
    let registry = ValueRegistry::default();
    for tag in [0u8, 1, 2, 3, 4, 9, 10, 11, 12, 13] {
        assert!(registry.contains(tag), "tag {} missing", tag);
    }
    for tag in [5u8, 6, 7, 8, 14, 0xFB] {
        assert!(!registry.contains(tag), "tag {} unexpected", tag);
    }
}

#[test]
fn test_closure_decoder() {
    let mut registry = ValueRegistry::default();
    registry.register(
        0x07,
        |_: ValueType, reader: &mut dyn RecordRead| -> replwire::Result<RecordValue> {
            let count = reader.read_u8()?;
            let mut body = Vec::new();
            for _ in 0..count {
                body.extend_from_slice(&reader.read_string()?);
            }
            Ok(RecordValue::Encoded(Bytes::from(body)))
        },
    );

    let bytes = SnapshotBuilder::new("0006")
        .raw(&[0x07])
        .string(b"module")
        .raw(&[2])
        .string(b"ab")
        .string(b"cd")
        .string_entry(b"after", b"ok")
        .finish();

    let mut decoder = SnapshotDecoder::new(Cursor::new(bytes)).with_registry(registry);
    let records: Vec<_> = decoder.records().collect::<replwire::Result<_>>().unwrap();

    let custom = records[0].entry().unwrap();
    assert_eq!(custom.value_type, ValueType::Other(7));
    assert_eq!(custom.value, RecordValue::Encoded(Bytes::from_static(b"abcd")));
    assert_eq!(
        records[1].entry().unwrap().value,
        RecordValue::String(Bytes::from_static(b"ok"))
    );
}

#[test]
fn test_override_builtin() {
    let mut registry = ValueRegistry::default();
    registry.register(
        ValueType::Zipmap.tag(),
        |_: ValueType, reader: &mut dyn RecordRead| -> replwire::Result<RecordValue> {
            let raw = reader.read_string()?;
            Ok(RecordValue::List(vec![raw]))
        },
    );

    let bytes = SnapshotBuilder::new("0006")
        .raw(&[ValueType::Zipmap.tag()])
        .string(b"k")
        .string(b"blob")
        .finish();

    let mut decoder = SnapshotDecoder::new(Cursor::new(bytes)).with_registry(registry);
    let record = decoder.decode_next().unwrap().unwrap();
    assert_eq!(
        record.entry().unwrap().value,
        RecordValue::List(vec![Bytes::from_static(b"blob")])
    );
}

#[test]
fn test_empty_registry_rejects_everything() {
    let bytes = SnapshotBuilder::new("0006").string_entry(b"k", b"v").finish();
    let mut decoder =
        SnapshotDecoder::new(Cursor::new(bytes)).with_registry(ValueRegistry::empty());
    assert!(matches!(
        decoder.decode_next(),
        Err(WireError::UnexpectedValueType(0))
    ));
}

#[test]
fn test_decoder_error_propagates() {
    let mut registry = ValueRegistry::empty();
    registry.register(0, StringValue).register(
        0x08,
        |_: ValueType, _: &mut dyn RecordRead| -> replwire::Result<RecordValue> {
            Err(WireError::UnexpectedValueType(0x08))
        },
    );

    let bytes = SnapshotBuilder::new("0006")
        .string_entry(b"k", b"v")
        .raw(&[0x08])
        .string(b"bad")
        .finish();

    let mut decoder = SnapshotDecoder::new(Cursor::new(bytes)).with_registry(registry);
    assert!(decoder.decode_next().unwrap().is_some());
    assert!(decoder.decode_next().is_err());
    assert!(matches!(decoder.decode_next(), Err(WireError::Aborted)));
}
