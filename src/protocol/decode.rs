//! Incremental Frame Decoding
//!
//! TCP delivers a byte stream, not frames: a read may carry half a
//! command or several at once. [`decode`] therefore works against
//! whatever bytes have accumulated so far and reports one of three
//! outcomes:
//!
//! - `Ok(Some((frame, consumed)))` - a complete frame; the caller drops
//!   `consumed` bytes from the front of its buffer and goes again,
//! - `Ok(None)` - the buffer holds only a prefix of a frame; read more,
//! - `Err(FrameError)` - the bytes cannot be the prefix of any valid
//!   frame; the connection should be torn down.
//!
//! Declared lengths are bounded before any allocation, so a hostile
//! `$999999999999` cannot reserve memory it never sends.

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::frame::{marker, Frame};

/// Largest accepted bulk payload.
pub const MAX_BULK_LEN: usize = 8 * 1024 * 1024;

/// Largest accepted array element count.
pub const MAX_ARRAY_LEN: usize = 1024;

/// Deepest accepted frame nesting.
pub const MAX_DEPTH: usize = 8;

/// Ways a byte sequence can fail to be a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// First byte of a frame is not a known marker.
    #[error("unknown frame marker {0:#04x}")]
    UnknownMarker(u8),

    /// A length or integer field did not parse as a decimal i64.
    #[error("malformed integer field")]
    BadInteger,

    /// Simple/error text was not valid UTF-8.
    #[error("invalid utf-8 in text frame")]
    BadUtf8,

    /// A declared length was negative (other than the null -1) or above
    /// the configured bound.
    #[error("declared length {0} out of bounds")]
    LengthOutOfBounds(i64),

    /// Arrays nested beyond [`MAX_DEPTH`].
    #[error("frame nesting too deep")]
    TooDeep,

    /// A CR not followed by LF, or payload not terminated by CRLF.
    #[error("missing CRLF terminator")]
    BadTerminator,
}

/// Attempts to decode one frame from the front of `src`.
pub fn decode(src: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
    let mut cur = Cursor { buf: src, pos: 0 };
    match decode_value(&mut cur, 0)? {
        Some(frame) => Ok(Some((frame, cur.pos))),
        None => Ok(None),
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_byte(&mut self) -> Option<u8> {
        let b = self.buf.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    /// One CRLF-terminated line, excluding the terminator. `None` when
    /// the terminator has not arrived yet.
    fn take_line(&mut self) -> Result<Option<&'a [u8]>, FrameError> {
        let start = self.pos;
        let mut i = start;
        while i < self.buf.len() {
            if self.buf[i] == b'\r' {
                match self.buf.get(i + 1) {
                    Some(b'\n') => {
                        self.pos = i + 2;
                        return Ok(Some(&self.buf[start..i]));
                    }
                    Some(_) => return Err(FrameError::BadTerminator),
                    None => return Ok(None),
                }
            }
            i += 1;
        }
        Ok(None)
    }

    fn take_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }
}

fn parse_i64(line: &[u8]) -> Result<i64, FrameError> {
    std::str::from_utf8(line)
        .map_err(|_| FrameError::BadInteger)?
        .parse()
        .map_err(|_| FrameError::BadInteger)
}

fn decode_value(cur: &mut Cursor<'_>, depth: usize) -> Result<Option<Frame>, FrameError> {
    if depth > MAX_DEPTH {
        return Err(FrameError::TooDeep);
    }

    let m = match cur.take_byte() {
        Some(b) => b,
        None => return Ok(None),
    };

    match m {
        marker::SIMPLE => {
            let line = match cur.take_line()? {
                Some(l) => l,
                None => return Ok(None),
            };
            let text = std::str::from_utf8(line).map_err(|_| FrameError::BadUtf8)?;
            Ok(Some(Frame::Simple(text.to_string())))
        }
        marker::ERROR => {
            let line = match cur.take_line()? {
                Some(l) => l,
                None => return Ok(None),
            };
            let text = std::str::from_utf8(line).map_err(|_| FrameError::BadUtf8)?;
            Ok(Some(Frame::Error(text.to_string())))
        }
        marker::INTEGER => {
            let line = match cur.take_line()? {
                Some(l) => l,
                None => return Ok(None),
            };
            Ok(Some(Frame::Integer(parse_i64(line)?)))
        }
        marker::BULK => {
            let line = match cur.take_line()? {
                Some(l) => l,
                None => return Ok(None),
            };
            let declared = parse_i64(line)?;
            if declared == -1 {
                return Ok(Some(Frame::Null));
            }
            if declared < 0 || declared as usize > MAX_BULK_LEN {
                return Err(FrameError::LengthOutOfBounds(declared));
            }
            let len = declared as usize;
            let payload = match cur.take_exact(len) {
                Some(p) => p,
                None => return Ok(None),
            };
            match cur.take_exact(2) {
                Some(b"\r\n") => Ok(Some(Frame::Bulk(Bytes::copy_from_slice(payload)))),
                Some(_) => Err(FrameError::BadTerminator),
                None => Ok(None),
            }
        }
        marker::ARRAY => {
            let line = match cur.take_line()? {
                Some(l) => l,
                None => return Ok(None),
            };
            let declared = parse_i64(line)?;
            if declared == -1 {
                return Ok(Some(Frame::Null));
            }
            if declared < 0 || declared as usize > MAX_ARRAY_LEN {
                return Err(FrameError::LengthOutOfBounds(declared));
            }
            let mut items = Vec::with_capacity(declared as usize);
            for _ in 0..declared {
                match decode_value(cur, depth + 1)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Frame::Array(items)))
        }
        other => Err(FrameError::UnknownMarker(other)),
    }
}
