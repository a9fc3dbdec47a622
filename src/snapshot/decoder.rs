//! Snapshot decoder
//!
//! Pull-based state machine over a snapshot stream:
//!
//! ```text
//! Header ──magic ok──▶ Body ──0xFF──▶ Terminated
//!                       │ ▲
//!                       └─┘ 0xFE select db / 0xFD, 0xFC expiry + entry / entry
//! ```
//!
//! Any error moves the decoder to a failed state; later calls return
//! [`WireError::Aborted`].

use std::io::Read;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, WireError};
use crate::observer::{DecodeEvent, DecodeObserver};

use super::{
    ChecksumReader, ChecksumStatus, Entry, Expiry, RecordRead, SnapshotRecord, ValueRegistry,
    ValueType,
};

/// Magic bytes opening every snapshot
pub const MAGIC: &[u8; 5] = b"REDIS";

/// End of snapshot, followed by the checksum on newer versions
pub const OPCODE_EOF: u8 = 0xFF;

/// Database selector, followed by a length-encoded index
pub const OPCODE_SELECTDB: u8 = 0xFE;

/// Expiry in seconds (4 bytes LE), followed by an entry
pub const OPCODE_EXPIRETIME: u8 = 0xFD;

/// Expiry in milliseconds (8 bytes LE), followed by an entry
pub const OPCODE_EXPIRETIME_MS: u8 = 0xFC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Terminated,
    Failed,
}

/// Decoder for the point-in-time snapshot format
pub struct SnapshotDecoder<R> {
    reader: ChecksumReader<R>,
    config: Config,
    registry: ValueRegistry,
    observer: Option<Arc<dyn DecodeObserver>>,
    state: State,
    version: Option<u32>,
    db: Option<u64>,
    checksum: ChecksumStatus,
}

impl<R: Read> SnapshotDecoder<R> {
    /// Create a decoder with the default config and value registry
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, Config::default())
    }

    pub fn with_config(reader: R, config: Config) -> Self {
        Self {
            reader: ChecksumReader::new(reader, config.read_buffer_size, config.max_bulk_len),
            config,
            registry: ValueRegistry::default(),
            observer: None,
            state: State::Header,
            version: None,
            db: None,
            checksum: ChecksumStatus::Pending,
        }
    }

    /// Replace the value decoder registry
    pub fn with_registry(mut self, registry: ValueRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attach a diagnostics observer
    pub fn with_observer(mut self, observer: Arc<dyn DecodeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Format version, once the header has been read
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Active database index, once a selector has been read
    pub fn database(&self) -> Option<u64> {
        self.db
    }

    pub fn checksum_status(&self) -> ChecksumStatus {
        self.checksum
    }

    /// True once the end marker (and checksum) have been read
    pub fn is_terminated(&self) -> bool {
        self.state == State::Terminated
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.reader.consumed()
    }

    /// Unwrap the source. Bytes already buffered are lost.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Read and validate the header, returning the format version.
    ///
    /// Called implicitly by the first [`decode_next`](Self::decode_next).
    pub fn read_header(&mut self) -> Result<u32> {
        match self.state {
            State::Failed => return Err(WireError::Aborted),
            State::Header => {}
            State::Body | State::Terminated => return Ok(self.version.unwrap_or_default()),
        }
        let result = self.parse_header();
        self.settle(result)
    }

    /// Decode the next record.
    ///
    /// Returns `Ok(None)` once the end marker has been read; later calls keep
    /// returning `Ok(None)`.
    pub fn decode_next(&mut self) -> Result<Option<SnapshotRecord>> {
        match self.state {
            State::Failed => return Err(WireError::Aborted),
            State::Terminated => return Ok(None),
            State::Header => {
                self.read_header()?;
            }
            State::Body => {}
        }
        let result = self.read_record();
        self.settle(result)
    }

    /// Iterate over records until the end marker or an error
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            decoder: self,
            done: false,
        }
    }

    fn parse_header(&mut self) -> Result<u32> {
        let mut magic = [0u8; 5];
        self.reader.read_exact_bytes(&mut magic)?;
        if &magic != MAGIC {
            return Err(WireError::framing(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let mut digits = [0u8; 4];
        self.reader.read_exact_bytes(&mut digits)?;
        let mut version: u32 = 0;
        for digit in digits {
            if !digit.is_ascii_digit() {
                return Err(WireError::framing(format!(
                    "bad version {:?}",
                    String::from_utf8_lossy(&digits)
                )));
            }
            version = version * 10 + u32::from(digit - b'0');
        }

        self.version = Some(version);
        self.state = State::Body;
        self.emit(&DecodeEvent::SnapshotHeader { version });
        Ok(version)
    }

    fn read_record(&mut self) -> Result<Option<SnapshotRecord>> {
        let opcode = self.reader.read_u8()?;
        let (expiry, tag) = match opcode {
            OPCODE_EOF => {
                self.finish()?;
                return Ok(None);
            }
            OPCODE_SELECTDB => {
                let index = self.reader.read_plain_length()?;
                self.db = Some(index);
                self.emit(&DecodeEvent::SelectDb { index });
                return Ok(Some(SnapshotRecord::SelectDb(index)));
            }
            OPCODE_EXPIRETIME => {
                let expiry = Expiry::from_secs(self.reader.read_u32_le()?);
                (Some(expiry), self.reader.read_u8()?)
            }
            OPCODE_EXPIRETIME_MS => {
                let expiry = Expiry::from_millis(self.reader.read_u64_le()?);
                (Some(expiry), self.reader.read_u8()?)
            }
            tag => (None, tag),
        };

        let entry = self.read_entry(tag)?;
        self.emit(&DecodeEvent::Entry {
            key: &entry.key,
            value_type: entry.value_type,
            expiring: expiry.is_some(),
        });
        Ok(Some(match expiry {
            Some(expiry) => SnapshotRecord::ExpiringEntry(expiry, entry),
            None => SnapshotRecord::PlainEntry(entry),
        }))
    }

    fn read_entry(&mut self, tag: u8) -> Result<Entry> {
        let decoder = self
            .registry
            .get(tag)
            .ok_or(WireError::UnexpectedValueType(tag))?;
        let key = self.reader.read_string()?;
        let value_type = ValueType::from_tag(tag);
        let value = decoder.decode(value_type, &mut self.reader)?;
        Ok(Entry {
            db: self.db,
            key,
            value_type,
            value,
        })
    }

    /// Handle the end marker: trailing checksum, then terminate
    fn finish(&mut self) -> Result<()> {
        let version = self.version.unwrap_or_default();
        let status = if version < self.config.checksum_min_version {
            ChecksumStatus::NotPresent
        } else {
            let computed = self.reader.checksum();
            let stored = self.reader.read_trailer()?;
            if stored == 0 || !self.config.verify_checksum {
                ChecksumStatus::Skipped
            } else if stored == computed {
                ChecksumStatus::Verified
            } else {
                return Err(WireError::ChecksumMismatch { stored, computed });
            }
        };

        self.checksum = status;
        self.state = State::Terminated;
        self.emit(&DecodeEvent::Checksum { status });
        Ok(())
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.state = State::Failed;
            self.emit(&DecodeEvent::Failed { error: err });
        }
        result
    }

    fn emit(&self, event: &DecodeEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}

/// Iterator returned by [`SnapshotDecoder::records`]
///
/// Yields at most one error, then stops.
pub struct Records<'a, R> {
    decoder: &'a mut SnapshotDecoder<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<SnapshotRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
