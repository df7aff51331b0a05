//! Command Dispatcher
//!
//! This module receives decoded commands, validates them, runs them against
//! the store, and returns the reply to send.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ RequestDecoder  │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ Request::parse  │  (request.rs)
//! └────────┬────────┘
//!          │ Request
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (handler.rs)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `ECHO`
//! - `GET`, `SET` (with optional `PX milliseconds`)

pub mod handler;
pub mod request;

pub use handler::CommandHandler;
pub use request::{CommandError, Request};
