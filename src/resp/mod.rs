//! Reply Protocol Module
//!
//! Decodes the line-and-length-prefixed request/reply protocol.
//!
//! ## Wire Format
//! ```text
//! +<text>\r\n                 simple string
//! -<text>\r\n                 error
//! :<int>\r\n                  integer
//! $<len>\r\n<bytes>\r\n       bulk string   ($-1\r\n = null)
//! *<count>\r\n<values...>     array         (*-1\r\n = null)
//! <word> <word>...\r\n        inline command (no type byte)
//! ```

mod decoder;
mod line;
mod serve;
mod stream;
mod value;

pub use decoder::{ReplyDecoder, Values};
pub use serve::serve_replies;
pub use stream::{BulkPayload, Frame};
pub use value::{FrameKind, Value};

/// Line terminator
pub const CRLF: &[u8; 2] = b"\r\n";
