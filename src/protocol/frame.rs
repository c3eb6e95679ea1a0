//! Wire Frames
//!
//! A [`Frame`] is one unit on the wire, in either direction: a client
//! command is an array of bulk strings, a reply is whichever shape the
//! command calls for. The grammar is a conventional prefix-marked one,
//! every element terminated by CRLF:
//!
//! - `+ok\r\n` - simple text
//! - `-NOTFOUND no key found\r\n` - error reply
//! - `:42\r\n` - signed 64-bit integer
//! - `$5\r\nhello\r\n` - length-prefixed (binary-safe) bulk string
//! - `$-1\r\n` - null
//! - `*2\r\n...` - array of frames, possibly nested

use bytes::Bytes;
use std::fmt;

/// Marker bytes, one per frame shape.
pub(crate) mod marker {
    pub const SIMPLE: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

pub(crate) const CRLF: &[u8] = b"\r\n";

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Short, CRLF-free text.
    Simple(String),
    /// An error reply; the first word is the error kind.
    Error(String),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A binary-safe string.
    Bulk(Bytes),
    /// The null frame (`$-1`).
    Null,
    /// An ordered collection of frames.
    Array(Vec<Frame>),
}

impl Frame {
    /// The `+ok` reply.
    pub fn ok() -> Self {
        Frame::Simple("ok".to_string())
    }

    /// An error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Frame::Error(message.into())
    }

    /// A bulk frame from anything byte-like.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(data.into())
    }

    /// Borrows the text of a `Simple` or UTF-8 `Bulk` frame.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Simple(s) => Some(s),
            Frame::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Serializes this frame onto the end of `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                buf.push(marker::SIMPLE);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                buf.push(marker::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Integer(n) => {
                buf.push(marker::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(data) => {
                buf.push(marker::BULK);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Frame::Null => {
                buf.push(marker::BULK);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Frame::Array(items) => {
                buf.push(marker::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    item.encode_into(buf);
                }
            }
        }
    }

    /// Serializes this frame into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{s}"),
            Frame::Error(s) => write!(f, "(error) {s}"),
            Frame::Integer(n) => write!(f, "(integer) {n}"),
            Frame::Bulk(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{s}\""),
                Err(_) => write!(f, "({} raw bytes)", data.len()),
            },
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
