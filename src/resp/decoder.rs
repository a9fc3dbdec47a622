//! Reply decoder
//!
//! Pull-based decoder over any byte source. Both consumption disciplines go
//! through the same head reader, so line and length framing live in one
//! place:
//!
//! - [`ReplyDecoder::decode_next`] materializes a whole [`Value`] tree
//! - [`ReplyDecoder::next_frame`] yields [`Frame`] tokens with lazily read
//!   bulk bodies

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{Result, WireError};
use crate::observer::{DecodeEvent, DecodeObserver};

use super::line::{expect_crlf, parse_integer, parse_length, read_line, split_inline};
use super::{BulkPayload, Frame, FrameKind, Value};

/// Upper bound on capacity reserved ahead of decoding array elements
const MAX_PREALLOC: usize = 1024;

/// Parsed first line of a unit, before any body is read
enum Head {
    SimpleString(String),
    Error(String),
    Integer(i64),
    Bulk(Option<u64>),
    Array(Option<u64>),
    Inline(Vec<Bytes>),
}

/// Decoder for the request/reply protocol
pub struct ReplyDecoder<R> {
    /// Buffered byte source
    reader: BufReader<R>,

    /// Limits and framing switches
    config: Config,

    /// Optional diagnostics hook
    observer: Option<Arc<dyn DecodeObserver>>,

    /// Unread bytes of the last streamed bulk body; its CRLF is still due
    pending_bulk: Option<u64>,

    /// Elements still owed to each open array (streaming mode)
    open_arrays: Vec<u64>,

    /// Set once any decode step fails
    failed: bool,
}

impl<R: Read> ReplyDecoder<R> {
    /// Create a decoder with the default config
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, Config::default())
    }

    /// Create a decoder with an explicit config
    pub fn with_config(reader: R, config: Config) -> Self {
        Self {
            reader: BufReader::with_capacity(config.read_buffer_size, reader),
            config,
            observer: None,
            pending_bulk: None,
            open_arrays: Vec::new(),
            failed: false,
        }
    }

    /// Attach a diagnostics observer
    pub fn with_observer(mut self, observer: Arc<dyn DecodeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True once a decode call has failed; every later call returns `Aborted`
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    /// Unwrap the source. Bytes already buffered are lost.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    // =========================================================================
    // Materializing API
    // =========================================================================

    /// Decode the next complete value.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between values.
    pub fn decode_next(&mut self) -> Result<Option<Value>> {
        self.ensure_usable()?;
        let result = self.decode_value_step();
        self.settle(result)
    }

    /// Iterate over materialized values until the stream ends or fails
    pub fn values(&mut self) -> Values<'_, R> {
        Values {
            decoder: self,
            done: false,
        }
    }

    fn decode_value_step(&mut self) -> Result<Option<Value>> {
        self.drain_pending()?;
        let value = self.read_value(self.open_arrays.len())?;
        if value.is_some() {
            self.element_done();
        }
        Ok(value)
    }

    fn read_value(&mut self, depth: usize) -> Result<Option<Value>> {
        let Some(head) = self.read_head(depth)? else {
            return Ok(None);
        };

        let value = match head {
            Head::SimpleString(s) => Value::SimpleString(s),
            Head::Error(s) => Value::Error(s),
            Head::Integer(i) => Value::Integer(i),
            Head::Bulk(None) => Value::BulkString(None),
            Head::Bulk(Some(len)) => Value::BulkString(Some(self.read_bulk_body(len)?)),
            Head::Array(None) => Value::Array(None),
            Head::Array(Some(len)) => {
                self.check_depth(depth)?;
                let mut items = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
                for i in 0..len {
                    match self.read_value(depth + 1)? {
                        Some(item) => items.push(item),
                        None => {
                            return Err(WireError::truncated(format!(
                                "array ended after {} of {} elements",
                                i, len
                            )))
                        }
                    }
                }
                Value::Array(Some(items))
            }
            Head::Inline(tokens) => Value::Array(Some(
                tokens.into_iter().map(|t| Value::BulkString(Some(t))).collect(),
            )),
        };
        Ok(Some(value))
    }

    fn read_bulk_body(&mut self, len: u64) -> Result<Bytes> {
        let mut body = Vec::with_capacity((len as usize).min(64 * 1024));
        let read = self.reader.by_ref().take(len).read_to_end(&mut body)?;
        if (read as u64) < len {
            return Err(WireError::truncated(format!(
                "bulk string ended after {} of {} bytes",
                read, len
            )));
        }
        expect_crlf(&mut self.reader)?;
        Ok(Bytes::from(body))
    }

    // =========================================================================
    // Streaming API
    // =========================================================================

    /// Decode the next frame without buffering bulk bodies.
    ///
    /// Any unread part of a previously returned [`BulkPayload`] is skipped
    /// first. Returns `Ok(None)` when the stream ends cleanly between values.
    pub fn next_frame(&mut self) -> Result<Option<Frame<'_>>> {
        self.ensure_usable()?;
        let head = match self.next_frame_head() {
            Ok(Some(head)) => head,
            Ok(None) => return Ok(None),
            Err(err) => return Err(self.fail(err)),
        };

        let frame = match head {
            Head::SimpleString(s) => Frame::SimpleString(s),
            Head::Error(s) => Frame::Error(s),
            Head::Integer(i) => Frame::Integer(i),
            Head::Bulk(None) => Frame::Bulk(None),
            Head::Bulk(Some(len)) => {
                let remaining = self.pending_bulk.insert(len);
                Frame::Bulk(Some(BulkPayload::new(&mut self.reader, remaining)))
            }
            Head::Array(len) => Frame::ArrayHeader(len.map(|n| n as usize)),
            Head::Inline(tokens) => Frame::Inline(tokens),
        };
        Ok(Some(frame))
    }

    fn next_frame_head(&mut self) -> Result<Option<Head>> {
        self.drain_pending()?;
        let depth = self.open_arrays.len();
        let Some(head) = self.read_head(depth)? else {
            return Ok(None);
        };

        self.element_done();
        if let Head::Array(Some(len)) = head {
            if len > 0 {
                self.check_depth(depth)?;
                self.open_arrays.push(len);
            }
        }
        Ok(Some(head))
    }

    /// Skip the unread rest of the last streamed bulk body and its CRLF
    fn drain_pending(&mut self) -> Result<()> {
        let Some(remaining) = self.pending_bulk.take() else {
            return Ok(());
        };
        if remaining > 0 {
            let skipped = io::copy(&mut self.reader.by_ref().take(remaining), &mut io::sink())?;
            if skipped < remaining {
                return Err(WireError::truncated(format!(
                    "bulk string ended with {} bytes unread",
                    remaining - skipped
                )));
            }
            self.emit(&DecodeEvent::BulkDrained { bytes: remaining });
        }
        expect_crlf(&mut self.reader)
    }

    /// Account for one finished element of the innermost open array
    fn element_done(&mut self) {
        if let Some(owed) = self.open_arrays.last_mut() {
            *owed -= 1;
        }
        while self.open_arrays.last() == Some(&0) {
            self.open_arrays.pop();
        }
    }

    // =========================================================================
    // Shared framing
    // =========================================================================

    /// Read the type byte and first line of the next unit.
    ///
    /// `Ok(None)` means end of stream at a top-level boundary; inside an
    /// array that is a truncation.
    fn read_head(&mut self, depth: usize) -> Result<Option<Head>> {
        loop {
            let type_byte = match self.reader.fill_buf()?.first() {
                Some(&b) => b,
                None if depth == 0 => return Ok(None),
                None => return Err(WireError::truncated("stream ended inside array")),
            };

            let kind = FrameKind::from_type_byte(type_byte).unwrap_or(FrameKind::Inline);
            if kind != FrameKind::Inline {
                self.reader.consume(1);
            } else if depth > 0 || !self.config.inline_commands {
                return Err(WireError::framing(format!(
                    "unexpected type byte 0x{:02x}",
                    type_byte
                )));
            }

            let line = read_line(&mut self.reader, self.config.max_line_len)?;
            let head = match kind {
                FrameKind::SimpleString => Head::SimpleString(utf8_line(line)?),
                FrameKind::Error => Head::Error(utf8_line(line)?),
                FrameKind::Integer => Head::Integer(parse_integer(&line)?),
                FrameKind::BulkString => {
                    Head::Bulk(parse_length(&line, self.config.max_bulk_len, "bulk string")?)
                }
                FrameKind::Array => {
                    Head::Array(parse_length(&line, self.config.max_array_len, "array")?)
                }
                FrameKind::Inline => {
                    let tokens = split_inline(&line);
                    if tokens.is_empty() {
                        // Blank inline lines carry no command
                        continue;
                    }
                    Head::Inline(tokens)
                }
            };
            self.emit(&DecodeEvent::ReplyFrame { kind });
            return Ok(Some(head));
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth >= self.config.max_depth {
            return Err(WireError::framing(format!(
                "array nesting exceeds {} levels",
                self.config.max_depth
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            return Err(WireError::Aborted);
        }
        Ok(())
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|err| self.fail(err))
    }

    fn fail(&mut self, err: WireError) -> WireError {
        self.failed = true;
        self.pending_bulk = None;
        self.open_arrays.clear();
        self.emit(&DecodeEvent::Failed { error: &err });
        err
    }

    fn emit(&self, event: &DecodeEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}

fn utf8_line(line: Vec<u8>) -> Result<String> {
    String::from_utf8(line).map_err(|_| WireError::framing("line is not valid UTF-8"))
}

/// Iterator returned by [`ReplyDecoder::values`]
///
/// Yields at most one error, then stops.
pub struct Values<'a, R> {
    decoder: &'a mut ReplyDecoder<R>,
    done: bool,
}

impl<R: Read> Iterator for Values<'_, R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode_next() {
            Ok(Some(value)) => Some(Ok(value)),
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
