//! Wire Codec
//!
//! This module converts between raw bytes and the logical request/reply types.
//!
//! ## Modules
//!
//! - `types`: [`Command`] and [`Reply`], plus reply serialization
//! - `parser`: the incremental [`RequestDecoder`]
//!
//! ## Example
//!
//! ```
//! use ttlkv::protocol::{Reply, RequestDecoder};
//!
//! let mut decoder = RequestDecoder::new();
//! decoder.extend(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
//! let command = decoder.decode().unwrap().unwrap();
//! assert_eq!(command.args(), &["name".to_string()]);
//!
//! let bytes = Reply::bulk("Ariz").serialize();
//! assert_eq!(bytes, b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_command, FrameLimits, ParseError, ParseResult, RequestDecoder};
pub use types::{Command, Reply};
