//! Error types for replwire
//!
//! Provides a unified error type for both decoders. Every error is fatal for
//! the stream it came from: RESP and RDB framing offer no point to resync at.

use thiserror::Error;

/// Result type alias using WireError
pub type Result<T> = std::result::Result<T, WireError>;

/// Unified error type for decode operations
#[derive(Debug, Error)]
pub enum WireError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(std::io::Error),

    #[error("Stream truncated: {0}")]
    Truncated(String),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Unexpected length-encoding marker: {0}")]
    UnexpectedLengthMarker(u8),

    #[error("Unexpected value type: 0x{0:02x}")]
    UnexpectedValueType(u8),

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("Checksum mismatch: stored 0x{stored:016x}, computed 0x{computed:016x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    // -------------------------------------------------------------------------
    // Decoder State
    // -------------------------------------------------------------------------
    #[error("Decoder aborted after an earlier error")]
    Aborted,
}

/// Coarse error category, for callers that decide retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Truncation,
    Framing,
    Integrity,
    Aborted,
}

impl WireError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            WireError::Io(_) => ErrorKind::Io,
            WireError::Truncated(_) => ErrorKind::Truncation,
            WireError::Framing(_)
            | WireError::UnexpectedLengthMarker(_)
            | WireError::UnexpectedValueType(_) => ErrorKind::Framing,
            WireError::ChecksumMismatch { .. } => ErrorKind::Integrity,
            WireError::Aborted => ErrorKind::Aborted,
        }
    }

    pub(crate) fn framing(message: impl Into<String>) -> Self {
        WireError::Framing(message.into())
    }

    pub(crate) fn truncated(message: impl Into<String>) -> Self {
        WireError::Truncated(message.into())
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        // A short read is a truncated stream, not a transport failure
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            WireError::Truncated(err.to_string())
        } else {
            WireError::Io(err)
        }
    }
}
