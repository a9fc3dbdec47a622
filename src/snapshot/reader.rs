//! Snapshot byte reader
//!
//! [`RecordRead`] is the primitive surface value decoders work against.
//! [`ChecksumReader`] implements it over a buffered source and folds every
//! byte it hands out into the running CRC64.

use std::io::{self, BufReader, Read};

use bytes::Bytes;

use crate::error::{Result, WireError};

use super::length::{decode_length, decode_plain_length, DecodeLength};
use super::{lzf, Crc64};

/// Chunk size for reading large strings without trusting their length
const READ_CHUNK: usize = 8 * 1024;

/// Byte-level reads available to snapshot value decoders
pub trait RecordRead {
    /// Fill `buf` completely, or fail with a truncation error
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Largest string a single field may declare
    fn max_string_len(&self) -> u64;

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_bytes(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact_bytes(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read exactly `len` raw bytes
    fn read_bytes(&mut self, len: u64) -> Result<Bytes> {
        if len > self.max_string_len() {
            return Err(WireError::framing(format!(
                "string length {} exceeds limit {}",
                len,
                self.max_string_len()
            )));
        }
        let len = len as usize;
        let mut out = Vec::with_capacity(len.min(READ_CHUNK * 8));
        let mut chunk = [0u8; READ_CHUNK];
        while out.len() < len {
            let n = (len - out.len()).min(READ_CHUNK);
            self.read_exact_bytes(&mut chunk[..n])?;
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(Bytes::from(out))
    }

    /// Decode a length field
    fn read_length(&mut self) -> Result<DecodeLength> {
        decode_length(self)
    }

    /// Decode a length field that must be a plain count
    fn read_plain_length(&mut self) -> Result<u64> {
        decode_plain_length(self)
    }

    /// Read a length-prefixed string.
    ///
    /// Embedded integers come back as their decimal text; compressed strings
    /// come back decompressed.
    fn read_string(&mut self) -> Result<Bytes> {
        match self.read_length()? {
            DecodeLength::Len(len) => self.read_bytes(len),
            DecodeLength::Compressed => {
                let compressed_len = self.read_plain_length()?;
                let original_len = self.read_plain_length()?;
                if original_len > self.max_string_len() {
                    return Err(WireError::framing(format!(
                        "compressed string expands to {} bytes, limit {}",
                        original_len,
                        self.max_string_len()
                    )));
                }
                let compressed = self.read_bytes(compressed_len)?;
                Ok(Bytes::from(lzf::decompress(&compressed, original_len as usize)?))
            }
            int => {
                let Some(width) = int.int_width() else {
                    return Err(WireError::framing(format!(
                        "expected integer marker, found {:?}",
                        int
                    )));
                };
                Ok(Bytes::from(self.read_embedded_int(width)?.to_string()))
            }
        }
    }

    /// Read a little-endian signed integer of `width` bytes (1, 2 or 4)
    fn read_embedded_int(&mut self, width: usize) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact_bytes(&mut buf[..width])?;
        let shift = 64 - 8 * width as u32;
        Ok(((u64::from_le_bytes(buf) << shift) as i64) >> shift)
    }

    /// Read a sorted-set score: one length byte, then ASCII text.
    ///
    /// Length bytes 253, 254 and 255 stand for NaN, +inf and -inf.
    fn read_double(&mut self) -> Result<f64> {
        match self.read_u8()? {
            253 => Ok(f64::NAN),
            254 => Ok(f64::INFINITY),
            255 => Ok(f64::NEG_INFINITY),
            len => {
                let mut buf = [0u8; 252];
                let text = &mut buf[..len as usize];
                self.read_exact_bytes(text)?;
                std::str::from_utf8(text)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        WireError::framing(format!(
                            "invalid score {:?}",
                            String::from_utf8_lossy(text)
                        ))
                    })
            }
        }
    }
}

/// Buffered reader that checksums everything it returns
pub struct ChecksumReader<R> {
    reader: BufReader<R>,
    crc: Crc64,
    consumed: u64,
    max_string_len: u64,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(reader: R, buffer_size: usize, max_string_len: u64) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            crc: Crc64::new(),
            consumed: 0,
            max_string_len,
        }
    }

    /// Checksum of every byte returned so far
    pub fn checksum(&self) -> u64 {
        self.crc.value()
    }

    /// Number of bytes returned so far, checksummed or not
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Read the 8-byte trailing checksum without folding it in
    pub fn read_trailer(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                WireError::truncated(format!(
                    "snapshot ended at offset {} while reading {} bytes",
                    self.consumed,
                    buf.len()
                ))
            } else {
                WireError::Io(err)
            }
        })?;
        self.consumed += buf.len() as u64;
        Ok(())
    }
}

impl<R: Read> RecordRead for ChecksumReader<R> {
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.fill(buf)?;
        self.crc.update(buf);
        Ok(())
    }

    fn max_string_len(&self) -> u64 {
        self.max_string_len
    }
}
