//! Snapshot record definitions

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// Value type tag stored in front of every key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    List,
    Set,
    SortedSet,
    Hash,
    Zipmap,
    Ziplist,
    Intset,
    SortedSetZiplist,
    HashZiplist,
    /// Tag with no built-in meaning; needs a registered decoder
    Other(u8),
}

impl ValueType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ValueType::String,
            1 => ValueType::List,
            2 => ValueType::Set,
            3 => ValueType::SortedSet,
            4 => ValueType::Hash,
            9 => ValueType::Zipmap,
            10 => ValueType::Ziplist,
            11 => ValueType::Intset,
            12 => ValueType::SortedSetZiplist,
            13 => ValueType::HashZiplist,
            other => ValueType::Other(other),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            ValueType::String => 0,
            ValueType::List => 1,
            ValueType::Set => 2,
            ValueType::SortedSet => 3,
            ValueType::Hash => 4,
            ValueType::Zipmap => 9,
            ValueType::Ziplist => 10,
            ValueType::Intset => 11,
            ValueType::SortedSetZiplist => 12,
            ValueType::HashZiplist => 13,
            ValueType::Other(tag) => *tag,
        }
    }
}

/// Resolution an expiry was stored with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryUnit {
    Seconds,
    Milliseconds,
}

/// Absolute expiry time of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// Time since the unix epoch
    pub at: Duration,
    pub unit: ExpiryUnit,
}

impl Expiry {
    pub fn from_secs(secs: u32) -> Self {
        Self {
            at: Duration::from_secs(u64::from(secs)),
            unit: ExpiryUnit::Seconds,
        }
    }

    /// Split into whole seconds and a millisecond remainder, so the full
    /// `u64` range is representable
    pub fn from_millis(millis: u64) -> Self {
        let secs = millis / 1000;
        let rem = (millis % 1000) as u32;
        Self {
            at: Duration::new(secs, rem * 1_000_000),
            unit: ExpiryUnit::Milliseconds,
        }
    }

    /// Milliseconds since the unix epoch, saturating
    pub fn as_millis(&self) -> u64 {
        u64::try_from(self.at.as_millis()).unwrap_or(u64::MAX)
    }

    /// `None` if the platform clock cannot represent the time
    pub fn to_system_time(&self) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(self.at)
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match now.duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => self.at <= since_epoch,
            Err(_) => false,
        }
    }
}

/// Decoded value body
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    String(Bytes),
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    SortedSet(Vec<(Bytes, f64)>),
    Hash(Vec<(Bytes, Bytes)>),

    /// Packed encoding (zipmap, ziplist, intset, ...) left for the caller
    Encoded(Bytes),
}

impl RecordValue {
    /// Element count for collections, 1 for strings and packed blobs
    pub fn len(&self) -> usize {
        match self {
            RecordValue::String(_) | RecordValue::Encoded(_) => 1,
            RecordValue::List(items) | RecordValue::Set(items) => items.len(),
            RecordValue::SortedSet(items) => items.len(),
            RecordValue::Hash(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A key with its decoded value
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Database the entry belongs to, if a selector preceded it
    pub db: Option<u64>,
    pub key: Bytes,
    pub value_type: ValueType,
    pub value: RecordValue,
}

/// One unit of a snapshot body
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotRecord {
    /// Following entries belong to this database
    SelectDb(u64),

    /// Entry preceded by an expiry marker
    ExpiringEntry(Expiry, Entry),

    /// Entry without expiry
    PlainEntry(Entry),
}

impl SnapshotRecord {
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            SnapshotRecord::SelectDb(_) => None,
            SnapshotRecord::ExpiringEntry(_, entry) | SnapshotRecord::PlainEntry(entry) => {
                Some(entry)
            }
        }
    }

    pub fn expiry(&self) -> Option<Expiry> {
        match self {
            SnapshotRecord::ExpiringEntry(expiry, _) => Some(*expiry),
            _ => None,
        }
    }
}

/// Outcome of the trailing checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// End marker not reached yet
    Pending,
    /// Version predates checksums
    NotPresent,
    /// Stored checksum was zero, or verification is disabled
    Skipped,
    /// Stored checksum matched
    Verified,
}
