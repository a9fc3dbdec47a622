//! Line primitives
//!
//! CRLF line reading and the integer/length parsing shared by the
//! materializing and streaming decode paths.

use std::io::{BufRead, Read};

use bytes::Bytes;

use crate::error::{Result, WireError};

use super::CRLF;

/// Read one CRLF-terminated line, returning it without the terminator.
///
/// A bare `\n`, or a `\r` that is not followed by `\n`, is a framing error.
pub(crate) fn read_line<B: BufRead>(reader: &mut B, max_len: usize) -> Result<Vec<u8>> {
    let limit = max_len as u64 + 2;
    let mut line = Vec::new();
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if n == 0 {
        return Err(WireError::truncated("stream ended before line"));
    }
    if line.last() != Some(&b'\n') {
        if line.len() as u64 >= limit {
            return Err(WireError::framing(format!(
                "line exceeds {} bytes",
                max_len
            )));
        }
        return Err(WireError::truncated("stream ended inside line"));
    }

    line.pop();
    if line.pop() != Some(b'\r') {
        return Err(WireError::framing("unexpected newline"));
    }
    if line.contains(&b'\r') {
        return Err(WireError::framing("expected newline after carriage return"));
    }
    Ok(line)
}

/// Consume the CRLF that terminates a bulk string body
pub(crate) fn expect_crlf<R: Read>(reader: &mut R) -> Result<()> {
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if &crlf != CRLF {
        return Err(WireError::framing("missing CRLF after bulk string"));
    }
    Ok(())
}

/// Parse a base-10 signed integer: optional `-`, then one or more digits
pub(crate) fn parse_integer(text: &[u8]) -> Result<i64> {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(WireError::framing(format!(
            "invalid integer {:?}",
            String::from_utf8_lossy(text)
        )));
    }

    let mut value: i64 = 0;
    for &d in digits {
        let digit = i64::from(d - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or_else(|| {
                WireError::framing(format!(
                    "integer out of range {:?}",
                    String::from_utf8_lossy(text)
                ))
            })?;
    }
    Ok(value)
}

/// Parse a bulk or array length line. `-1` is the null marker.
pub(crate) fn parse_length(text: &[u8], limit: u64, what: &str) -> Result<Option<u64>> {
    match parse_integer(text)? {
        -1 => Ok(None),
        n if n < 0 => Err(WireError::framing(format!(
            "negative {} length {}",
            what, n
        ))),
        n => {
            let n = n as u64;
            if n > limit {
                return Err(WireError::framing(format!(
                    "{} length {} exceeds limit {}",
                    what, n, limit
                )));
            }
            Ok(Some(n))
        }
    }
}

/// Split an inline command on spaces.
///
/// Runs of spaces collapse into one delimiter, so no token is ever empty.
pub(crate) fn split_inline(line: &[u8]) -> Vec<Bytes> {
    line.split(|&b| b == b' ')
        .filter(|token| !token.is_empty())
        .map(Bytes::copy_from_slice)
        .collect()
}
