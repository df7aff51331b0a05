//! Server configuration
//!
//! Every option can be given as a flag or through a `TTLKV_*` environment
//! variable; flags win.

use crate::protocol::parser::{DEFAULT_MAX_ARGS, DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_FRAME_LEN};
use crate::protocol::FrameLimits;
use crate::storage::DEFAULT_SHARDS;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "ttlkv",
    version,
    about = "A minimal in-memory key-value server with per-key expiry",
    after_help = "CONNECTING:\n    $ redis-cli -p 6379\n    127.0.0.1:6379> SET name Ariz PX 5000\n    OK\n    127.0.0.1:6379> GET name\n    \"Ariz\""
)]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "TTLKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TTLKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of store shards
    #[arg(long, env = "TTLKV_SHARDS", default_value_t = DEFAULT_SHARDS, value_parser = parse_positive)]
    pub shards: usize,

    /// Maximum number of elements in one request, command name included
    #[arg(long, env = "TTLKV_MAX_ARGS", default_value_t = DEFAULT_MAX_ARGS, value_parser = parse_positive)]
    pub max_args: usize,

    /// Maximum length in bytes of one argument
    #[arg(long, env = "TTLKV_MAX_BULK_LEN", default_value_t = DEFAULT_MAX_BULK_LEN, value_parser = parse_positive)]
    pub max_bulk_len: usize,

    /// Maximum length in bytes of one request frame
    #[arg(long, env = "TTLKV_MAX_FRAME_LEN", default_value_t = DEFAULT_MAX_FRAME_LEN, value_parser = parse_positive)]
    pub max_frame_len: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            max_args: self.max_args,
            max_bulk_len: self.max_bulk_len,
            max_frame_len: self.max_frame_len,
        }
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["ttlkv"]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:6379");
        assert_eq!(config.shards, DEFAULT_SHARDS);
        assert_eq!(config.frame_limits(), FrameLimits::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "ttlkv",
            "--host",
            "0.0.0.0",
            "-p",
            "6380",
            "--shards",
            "4",
            "--max-args",
            "8",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:6380");
        assert_eq!(config.shards, 4);
        assert_eq!(config.frame_limits().max_args, 8);
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        assert!(Config::try_parse_from(["ttlkv", "--shards", "0"]).is_err());
        assert!(Config::try_parse_from(["ttlkv", "--port", "http"]).is_err());
        assert!(Config::try_parse_from(["ttlkv", "--max-frame-len", "-1"]).is_err());
    }
}
