//! Snapshot Module
//!
//! Decodes the point-in-time snapshot stream sent during full
//! synchronization.
//!
//! ## Stream Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (9 bytes)                                        │
//! │   Magic: "REDIS" (5) | Version: 4 ASCII digits (4)      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Body (repeated)                                         │
//! │   0xFE [len]                       select database      │
//! │   0xFD [u32 LE] [type] [key] [val] entry, expiry in s   │
//! │   0xFC [u64 LE] [type] [key] [val] entry, expiry in ms  │
//! │   [type] [key] [val]               entry                │
//! ├─────────────────────────────────────────────────────────┤
//! │ End                                                     │
//! │   0xFF | CRC64 LE (8, version >= 5, 0 = not computed)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every byte before the trailing checksum is folded into a running CRC64.

mod checksum;
mod decoder;
mod length;
mod lzf;
mod reader;
mod record;
mod registry;

pub use checksum::{crc64, Crc64};
pub use decoder::{
    Records, SnapshotDecoder, MAGIC, OPCODE_EOF, OPCODE_EXPIRETIME, OPCODE_EXPIRETIME_MS,
    OPCODE_SELECTDB,
};
pub use lzf::decompress as lzf_decompress;
pub use length::{decode_length, decode_plain_length, DecodeLength};
pub use reader::{ChecksumReader, RecordRead};
pub use record::{
    ChecksumStatus, Entry, Expiry, ExpiryUnit, RecordValue, SnapshotRecord, ValueType,
};
pub use registry::{
    FieldPairs, PackedBlob, ScoredMembers, StringSequence, StringValue, ValueDecoder,
    ValueRegistry,
};
