//! Wire Types
//!
//! This module defines the two values that cross the wire: the [`Command`]
//! a client sends and the [`Reply`] the server answers with.
//!
//! ## Protocol Format
//!
//! Requests are always an array of bulk strings:
//!
//! ```text
//! *<N>\r\n                 N arguments follow
//! $<len>\r\n<bytes>\r\n    one argument, repeated N times
//! ```
//!
//! Replies are one of three forms:
//!
//! - Status: `+OK\r\n`
//! - Bulk string: `$5\r\nhello\r\n`
//! - Null: `$-1\r\n`

use std::fmt;

/// The CRLF terminator used in the protocol
pub const CRLF: &[u8] = b"\r\n";

/// Type prefixes used by requests and replies
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One decoded client request.
///
/// The first argument is the command name, the remaining ones are its
/// positional arguments. A `Command` always holds at least the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    /// Builds a command from its arguments, name first.
    ///
    /// Returns `None` when `args` is empty.
    pub fn new(args: Vec<String>) -> Option<Self> {
        if args.is_empty() {
            None
        } else {
            Some(Self { args })
        }
    }

    /// Convenience constructor for tests and clients.
    ///
    /// # Example
    /// ```
    /// use ttlkv::protocol::Command;
    /// let cmd = Command::from_parts(["SET", "name", "Ariz"]).unwrap();
    /// assert_eq!(cmd.name(), "SET");
    /// ```
    pub fn from_parts<I, S>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(parts.into_iter().map(Into::into).collect())
    }

    /// The command name exactly as sent by the client.
    pub fn name(&self) -> &str {
        &self.args[0]
    }

    /// Arguments following the command name.
    pub fn args(&self) -> &[String] {
        &self.args[1..]
    }

    /// Number of elements including the name.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Always false; a command carries at least its name.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Consumes the command, returning every element including the name.
    pub fn into_parts(self) -> Vec<String> {
        self.args
    }

    /// Encodes this command as a request frame.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(prefix::ARRAY);
        buf.extend_from_slice(self.args.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for arg in &self.args {
            write_bulk(&mut buf, arg);
        }
        buf
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// A reply sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status line, e.g. `+OK\r\n`. Must not contain CRLF.
    Status(String),

    /// Length-prefixed string: `$<len>\r\n<data>\r\n`
    Bulk(String),

    /// Absent value: `$-1\r\n`
    Null,
}

impl Reply {
    pub fn status(s: impl Into<String>) -> Self {
        Reply::Status(s.into())
    }

    pub fn bulk(s: impl Into<String>) -> Self {
        Reply::Bulk(s.into())
    }

    /// Common reply for successful writes
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// Reply to a bare PING
    pub fn pong() -> Self {
        Reply::Status("PONG".to_string())
    }

    /// Maps an optional value to a bulk string or null.
    pub fn from_value(value: Option<String>) -> Self {
        match value {
            Some(v) => Reply::Bulk(v),
            None => Reply::Null,
        }
    }

    /// Serializes the reply to its wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Status(s) => {
                buf.push(prefix::STATUS);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(s) => write_bulk(buf, s),
            Reply::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Reply::Null)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Bulk(s) => write!(f, "\"{}\"", s),
            Reply::Null => write!(f, "(nil)"),
        }
    }
}

// Length is the byte length, not the char count.
fn write_bulk(buf: &mut Vec<u8>, s: &str) {
    buf.push(prefix::BULK_STRING);
    buf.extend_from_slice(s.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(s.as_bytes());
    buf.extend_from_slice(CRLF);
}
