//! # ttlkv - A Minimal In-Memory Key-Value Server
//!
//! ttlkv speaks a small subset of the Redis protocol over TCP and stores
//! string values with an optional per-key expiry.
//!
//! ## Features
//!
//! - **Incremental Decoding**: frames split across reads are reassembled
//! - **TTL Support**: `SET key value PX <milliseconds>`
//! - **Lazy Expiry**: expired keys are never served and are removed on access
//! - **Async I/O**: one Tokio task per connection, sharing a single store
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               ttlkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │  Request    │    │            Store             │ │
//! │                     │  Decoder    │    │  ┌───────┐ ┌───────┐ ┌─────┐ │ │
//! │                     └─────────────┘    │  │Shard 0│ │Shard 1│ │...N │ │ │
//! │                                        │  └───────┘ └───────┘ └─────┘ │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use ttlkv::protocol::FrameLimits;
//! use ttlkv::storage::Store;
//! use ttlkv::connection::ConnectionStats;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(Store::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     ttlkv::server::serve(listener, store, stats, FrameLimits::default()).await;
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `GET key`
//! - `SET key value [PX milliseconds]`
//!
//! Unknown commands get no reply.
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoder, command and reply types
//! - [`commands`]: request validation and dispatch
//! - [`storage`]: the sharded store with TTL support
//! - [`connection`]: per-client read/execute/reply loop
//! - [`server`]: accept loop
//! - [`config`]: command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, FrameLimits, ParseError, Reply, RequestDecoder};
pub use storage::Store;

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of ttlkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
