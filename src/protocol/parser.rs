//! Incremental Request Decoder
//!
//! Stream reads do not line up with frame boundaries: one read may carry half
//! a command, or three commands and the first byte of a fourth. The decoder
//! therefore never consumes anything until a complete frame is available.
//!
//! ## How the Decoder Works
//!
//! [`parse_command`] inspects a byte slice and returns either:
//! - `Ok(Some((command, consumed)))` - a full frame was decoded from the first `consumed` bytes
//! - `Ok(None)` - the frame is incomplete, wait for more data
//! - `Err(ParseError)` - the bytes can never become a valid frame
//!
//! [`RequestDecoder`] wraps it with an owned buffer:
//! 1. The transport appends incoming data with [`RequestDecoder::extend`]
//!    (or reads straight into [`RequestDecoder::buffer_mut`])
//! 2. [`RequestDecoder::decode`] yields commands while complete frames exist
//! 3. Unconsumed bytes stay buffered for the next read
//! 4. After an error the caller may [`RequestDecoder::discard`] the remainder

use crate::protocol::types::{prefix, Command, CRLF};
use bytes::{Buf, BytesMut};
use thiserror::Error;

/// Errors that can occur while decoding a request frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A frame or element started with the wrong type byte
    #[error("expected '{expected}' but found byte {found:#04x}")]
    UnexpectedPrefix { expected: char, found: u8 },

    /// A length header is not a plain decimal integer
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    /// The array header announced zero or a negative number of elements
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// A bulk string header announced a negative length
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// An argument is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Protocol violation (missing CRLF, oversized header, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("too many arguments: {count} (max: {max})")]
    TooManyArguments { count: usize, max: usize },

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Default maximum number of elements in one request
pub const DEFAULT_MAX_ARGS: usize = 1024;

/// Default maximum size of one bulk string (1 MiB)
pub const DEFAULT_MAX_BULK_LEN: usize = 1024 * 1024;

/// Default maximum size of one complete frame (8 MiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Longest accepted length header, in digits (fits any i64)
const MAX_HEADER_DIGITS: usize = 20;

/// Size limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Maximum number of elements, command name included
    pub max_args: usize,
    /// Maximum payload length of a single bulk string
    pub max_bulk_len: usize,
    /// Maximum length of a complete frame on the wire
    pub max_frame_len: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_args: DEFAULT_MAX_ARGS,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Attempts to decode one request frame from the start of `buf`.
///
/// # Returns
///
/// - `Ok(Some((command, consumed)))` - Successfully decoded a command
/// - `Ok(None)` - Incomplete data, need more bytes
/// - `Err(e)` - Malformed frame
pub fn parse_command(buf: &[u8], limits: &FrameLimits) -> ParseResult<Option<(Command, usize)>> {
    let (count, mut consumed) = match read_header(buf, 0, prefix::ARRAY)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if count < 1 {
        return Err(ParseError::InvalidArrayLength(count));
    }
    let count = count as usize;
    if count > limits.max_args {
        return Err(ParseError::TooManyArguments {
            count,
            max: limits.max_args,
        });
    }

    let mut args = Vec::with_capacity(count);

    for _ in 0..count {
        let (length, data_start) = match read_header(buf, consumed, prefix::BULK_STRING)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }
        let length = length as usize;
        if length > limits.max_bulk_len {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: limits.max_bulk_len,
            });
        }

        let data_end = data_start + length;
        let total_needed = data_end + CRLF.len();
        if total_needed > limits.max_frame_len {
            return Err(ParseError::MessageTooLarge {
                size: total_needed,
                max: limits.max_frame_len,
            });
        }

        if buf.len() < total_needed {
            // A partial terminator is fine, anything else after the payload is not
            if buf.len() > data_end && buf[data_end] != b'\r' {
                return Err(missing_terminator());
            }
            return Ok(None);
        }

        if &buf[data_end..total_needed] != CRLF {
            return Err(missing_terminator());
        }

        let arg = std::str::from_utf8(&buf[data_start..data_end])
            .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
        args.push(arg.to_owned());
        consumed = total_needed;
    }

    match Command::new(args) {
        Some(command) => Ok(Some((command, consumed))),
        None => Err(ParseError::InvalidArrayLength(0)),
    }
}

/// Reads a `<prefix><integer>\r\n` header starting at `start`.
///
/// Returns the integer and the offset just past the CRLF.
fn read_header(buf: &[u8], start: usize, expected: u8) -> ParseResult<Option<(i64, usize)>> {
    let Some(&found) = buf.get(start) else {
        return Ok(None);
    };
    if found != expected {
        return Err(ParseError::UnexpectedPrefix {
            expected: expected as char,
            found,
        });
    }

    let line = &buf[start + 1..];
    match find_crlf(line) {
        Some(pos) => {
            let n = parse_length(&line[..pos])?;
            Ok(Some((n, start + 1 + pos + CRLF.len())))
        }
        // Room for the digits plus a trailing '\r' still waiting for its '\n'
        None if line.len() > MAX_HEADER_DIGITS + 1 => Err(ParseError::ProtocolError(
            "length header is not terminated".to_string(),
        )),
        None => Ok(None),
    }
}

fn parse_length(digits: &[u8]) -> ParseResult<i64> {
    let s = std::str::from_utf8(digits)
        .map_err(|_| ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;
    if s.is_empty() || s.starts_with('+') {
        return Err(ParseError::InvalidLength(s.to_string()));
    }
    s.parse()
        .map_err(|_| ParseError::InvalidLength(s.to_string()))
}

fn missing_terminator() -> ParseError {
    ParseError::ProtocolError("bulk string length does not match its payload".to_string())
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// A resumable decoder owning the bytes received so far on one connection.
///
/// # Example
///
/// ```
/// use ttlkv::protocol::RequestDecoder;
///
/// let mut decoder = RequestDecoder::new();
/// decoder.extend(b"*1\r\n$4\r\nPI");
/// assert!(decoder.decode().unwrap().is_none());
///
/// decoder.extend(b"NG\r\n");
/// let command = decoder.decode().unwrap().unwrap();
/// assert_eq!(command.name(), "PING");
/// ```
#[derive(Debug, Default)]
pub struct RequestDecoder {
    buffer: BytesMut,
    limits: FrameLimits,
}

impl RequestDecoder {
    /// Creates a decoder with default limits.
    pub fn new() -> Self {
        Self::with_limits(FrameLimits::default())
    }

    pub fn with_limits(limits: FrameLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            limits,
        }
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Appends freshly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Direct access to the buffer, for reading from a socket without an extra copy.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Decodes the next complete command, if one is buffered.
    ///
    /// On success the frame's bytes are removed from the buffer. On
    /// `Ok(None)` and on error the buffer is left untouched.
    pub fn decode(&mut self) -> ParseResult<Option<Command>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match parse_command(&self.buffer, &self.limits)? {
            Some((command, consumed)) => {
                self.buffer.advance(consumed);
                Ok(Some(command))
            }
            None => Ok(None),
        }
    }

    /// Drops everything buffered, returning how many bytes were discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }
}
