//! Length encoding
//!
//! The top two bits of the first byte select the form:
//!
//! ```text
//! 00xxxxxx                      6-bit length
//! 01xxxxxx xxxxxxxx             14-bit length
//! 10______ [4 bytes LE]         32-bit length, low 6 bits ignored
//! 11xxxxxx                      special marker in the low 6 bits
//! ```
//!
//! Special markers 0/1/2 announce an embedded 8/16/32-bit signed integer,
//! 4 announces a compressed string. Anything else is corrupt.

use crate::error::{Result, WireError};

use super::RecordRead;

const LEN_6BIT: u8 = 0b00;
const LEN_14BIT: u8 = 0b01;
const LEN_32BIT: u8 = 0b10;

const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;
const ENC_COMPRESSED: u8 = 4;

/// Result of decoding one length-prefixed field header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeLength {
    /// Plain byte count or element count
    Len(u64),

    /// An 8-bit signed integer follows instead of a string
    Int8,

    /// A 16-bit little-endian signed integer follows
    Int16,

    /// A 32-bit little-endian signed integer follows
    Int32,

    /// A compressed string follows: compressed length, original length, data
    Compressed,
}

impl DecodeLength {
    /// Width in bytes of an embedded integer marker
    pub fn int_width(&self) -> Option<usize> {
        match self {
            DecodeLength::Int8 => Some(1),
            DecodeLength::Int16 => Some(2),
            DecodeLength::Int32 => Some(4),
            _ => None,
        }
    }
}

/// Decode the next length field from `reader`
pub fn decode_length<R: RecordRead + ?Sized>(reader: &mut R) -> Result<DecodeLength> {
    let first = reader.read_u8()?;
    let low6 = first & 0x3F;

    match first >> 6 {
        LEN_6BIT => Ok(DecodeLength::Len(u64::from(low6))),
        LEN_14BIT => {
            let next = reader.read_u8()?;
            Ok(DecodeLength::Len((u64::from(low6) << 8) | u64::from(next)))
        }
        LEN_32BIT => Ok(DecodeLength::Len(u64::from(reader.read_u32_le()?))),
        _ => match low6 {
            ENC_INT8 => Ok(DecodeLength::Int8),
            ENC_INT16 => Ok(DecodeLength::Int16),
            ENC_INT32 => Ok(DecodeLength::Int32),
            ENC_COMPRESSED => Ok(DecodeLength::Compressed),
            other => Err(WireError::UnexpectedLengthMarker(other)),
        },
    }
}

/// Decode a length field that must be a plain count
pub fn decode_plain_length<R: RecordRead + ?Sized>(reader: &mut R) -> Result<u64> {
    match decode_length(reader)? {
        DecodeLength::Len(n) => Ok(n),
        special => Err(WireError::framing(format!(
            "expected plain length, found {:?}",
            special
        ))),
    }
}
