//! Streaming frames
//!
//! Token-level view of a reply stream. Bulk string bodies are handed out as
//! [`BulkPayload`] readers instead of buffers, so a multi-megabyte reply can
//! be copied to its destination in chunks.

use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;

use super::FrameKind;

/// One framed unit of a reply stream
///
/// Arrays are not nested here: `ArrayHeader(Some(n))` is followed by the
/// next `n` frames (recursively) as its elements.
#[derive(Debug)]
pub enum Frame<'a> {
    SimpleString(String),
    Error(String),
    Integer(i64),

    /// Bulk string body, or `None` for `$-1`
    Bulk(Option<BulkPayload<'a>>),

    /// Element count, or `None` for `*-1`
    ArrayHeader(Option<usize>),

    /// Space-delimited inline command tokens
    Inline(Vec<Bytes>),
}

impl Frame<'_> {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::SimpleString(_) => FrameKind::SimpleString,
            Frame::Error(_) => FrameKind::Error,
            Frame::Integer(_) => FrameKind::Integer,
            Frame::Bulk(_) => FrameKind::BulkString,
            Frame::ArrayHeader(_) => FrameKind::Array,
            Frame::Inline(_) => FrameKind::Inline,
        }
    }
}

/// Reader over exactly `len` bytes of a bulk string body.
///
/// The payload borrows its decoder, so it cannot be held across the next
/// decode call. Whatever is left unread, plus the CRLF terminator, is
/// skipped by that call.
pub struct BulkPayload<'a> {
    reader: &'a mut dyn Read,
    remaining: &'a mut u64,
    len: u64,
}

impl<'a> BulkPayload<'a> {
    pub(crate) fn new(reader: &'a mut dyn Read, remaining: &'a mut u64) -> Self {
        let len = *remaining;
        Self {
            reader,
            remaining,
            len,
        }
    }

    /// Declared length of the body
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> u64 {
        *self.remaining
    }

    /// Read the rest of the body into memory
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.remaining().min(64 * 1024) as usize);
        self.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for BulkPayload<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if *self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = usize::try_from(*self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let n = self.reader.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("bulk payload truncated with {} bytes unread", self.remaining),
            ));
        }
        *self.remaining -= n as u64;
        Ok(n)
    }
}

impl fmt::Debug for BulkPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkPayload")
            .field("len", &self.len)
            .field("remaining", &self.remaining)
            .finish()
    }
}
