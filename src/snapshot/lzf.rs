//! LZF decompression
//!
//! Each control byte starts either a literal run or a back-reference:
//!
//! ```text
//! 000LLLLL                      literal run of L+1 bytes
//! LLLooooo oooooooo             match of L+2 bytes, offset o+1 back
//! 111ooooo LLLLLLLL oooooooo    long match of L+9 bytes
//! ```

use crate::error::{Result, WireError};

/// Most output one input byte can produce: a 3-byte long match yields 264
const MAX_EXPANSION: usize = 88;

/// Upper bound on capacity reserved before any output is produced
const MAX_PREALLOC: usize = 64 * 1024;

/// Decompress `input`, which must expand to exactly `expected_len` bytes
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(initial_capacity(input.len(), expected_len));
    let mut i = 0;

    while i < input.len() {
        let ctrl = input[i] as usize;
        i += 1;

        if ctrl < 32 {
            let run = ctrl + 1;
            let end = i + run;
            if end > input.len() {
                return Err(corrupt("literal run past end of input"));
            }
            if output.len() + run > expected_len {
                return Err(corrupt("output exceeds declared length"));
            }
            output.extend_from_slice(&input[i..end]);
            i = end;
            continue;
        }

        let mut len = ctrl >> 5;
        if len == 7 {
            len += *input.get(i).ok_or_else(|| corrupt("missing long match length"))? as usize;
            i += 1;
        }
        len += 2;

        let low = *input.get(i).ok_or_else(|| corrupt("missing match offset"))? as usize;
        i += 1;
        let offset = (((ctrl & 0x1F) << 8) | low) + 1;

        let start = output
            .len()
            .checked_sub(offset)
            .ok_or_else(|| corrupt("back-reference before start of output"))?;
        if output.len() + len > expected_len {
            return Err(corrupt("output exceeds declared length"));
        }
        // Byte-wise: source and destination may overlap
        for j in 0..len {
            let byte = output[start + j];
            output.push(byte);
        }
    }

    if output.len() != expected_len {
        return Err(corrupt("decompressed size mismatch"));
    }
    Ok(output)
}

/// The declared length is untrusted; reserve no more than the input can fill
fn initial_capacity(input_len: usize, expected_len: usize) -> usize {
    expected_len
        .min(input_len.saturating_mul(MAX_EXPANSION))
        .min(MAX_PREALLOC)
}

fn corrupt(reason: &str) -> WireError {
    WireError::framing(format!("LZF: {}", reason))
}
