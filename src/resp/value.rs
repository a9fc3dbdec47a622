//! Reply value definitions
//!
//! Represents fully decoded protocol values.

use std::fmt;

use bytes::Bytes;

/// A decoded protocol value
///
/// `BulkString(None)` and `Array(None)` are the protocol's null encodings and
/// are distinct from an empty string or an empty array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `+OK\r\n`
    SimpleString(String),

    /// `-ERR message\r\n`
    Error(String),

    /// `:1000\r\n`
    Integer(i64),

    /// `$6\r\nfoobar\r\n`, or `$-1\r\n` for null
    BulkString(Option<Bytes>),

    /// `*2\r\n...`, or `*-1\r\n` for null
    Array(Option<Vec<Value>>),
}

/// Type of a framed reply unit, as announced by its leading byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    SimpleString,
    Error,
    Integer,
    BulkString,
    Array,
    Inline,
}

impl FrameKind {
    /// Map a leading type byte to its frame kind
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            b'+' => Some(FrameKind::SimpleString),
            b'-' => Some(FrameKind::Error),
            b':' => Some(FrameKind::Integer),
            b'$' => Some(FrameKind::BulkString),
            b'*' => Some(FrameKind::Array),
            _ => None,
        }
    }
}

impl Value {
    /// Create a non-null bulk string
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Value::BulkString(Some(data.into()))
    }

    /// Create a non-null array
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Some(items))
    }

    /// True for the null bulk string and the null array
    pub fn is_null(&self) -> bool {
        matches!(self, Value::BulkString(None) | Value::Array(None))
    }

    /// Bytes of a bulk string or the text of a simple string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::BulkString(Some(b)) => Some(b),
            Value::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Text of a simple string, error, or UTF-8 bulk string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::SimpleString(s) | Value::Error(s) => Some(s),
            Value::BulkString(Some(b)) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Elements of a non-null array
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => items,
            _ => None,
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Value::SimpleString(_) => FrameKind::SimpleString,
            Value::Error(_) => FrameKind::Error,
            Value::Integer(_) => FrameKind::Integer,
            Value::BulkString(_) => FrameKind::BulkString,
            Value::Array(_) => FrameKind::Array,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Value::SimpleString(s) => write!(f, "{}", s),
            Value::Error(s) => write!(f, "(error) {}", s),
            Value::Integer(i) => write!(f, "(integer) {}", i),
            Value::BulkString(None) => write!(f, "(nil)"),
            Value::BulkString(Some(b)) => write!(f, "\"{}\"", b.escape_ascii()),
            Value::Array(None) => write!(f, "(nil array)"),
            Value::Array(Some(items)) if items.is_empty() => write!(f, "(empty array)"),
            Value::Array(Some(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n{:width$}", "", width = indent)?;
                    }
                    let label = format!("{}) ", i + 1);
                    write!(f, "{}", label)?;
                    item.fmt_indented(f, indent + label.len())?;
                }
                Ok(())
            }
        }
    }
}

/// Renders values the way `redis-cli` prints replies
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
