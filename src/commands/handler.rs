//! Command Handler
//!
//! Runs validated requests against the store and builds the reply.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `GET key` - Get a key's value, null if absent or expired
//! - `SET key value [PX milliseconds]` - Set a key with optional expiry
//!
//! Unknown commands and malformed arguments produce no reply at all.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   Command   │───>│   Request   │───>│  dispatch() │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                             Store           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::request::{CommandError, Request};
use crate::protocol::{Command, Reply};
use crate::storage::Store;
use std::sync::Arc;
use tracing::{debug, trace};

/// Dispatches commands to the shared store.
///
/// Cloning is cheap; every connection gets its own clone.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Executes a decoded command.
    ///
    /// # Returns
    ///
    /// The reply to send back, or `None` when the command is unknown or its
    /// arguments are malformed. Nothing is sent to the client in that case.
    pub fn execute(&self, command: Command) -> Option<Reply> {
        match Request::parse(command) {
            Ok(request) => Some(self.dispatch(request)),
            Err(CommandError::Unknown(name)) => {
                debug!(command = %name, "Ignoring unknown command");
                None
            }
            Err(e) => {
                debug!(error = %e, "Ignoring malformed command");
                None
            }
        }
    }

    /// Runs a validated request.
    pub fn dispatch(&self, request: Request) -> Reply {
        trace!(
            command = request.name(),
            touches_store = request.touches_store(),
            "Dispatching"
        );

        match request {
            Request::Ping(None) => Reply::pong(),
            Request::Ping(Some(message)) => Reply::bulk(message),
            Request::Echo(message) => Reply::bulk(message),
            Request::Get(key) => Reply::from_value(self.store.get(&key)),
            Request::Set { key, value, ttl } => {
                self.store.set(key, value, ttl);
                Reply::ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(Store::new()))
    }

    fn make_command(args: &[&str]) -> Command {
        Command::from_parts(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["PING"]));
        assert_eq!(response, Some(Reply::pong()));

        let response = handler.execute(make_command(&["PING", "hello"]));
        assert_eq!(response, Some(Reply::bulk("hello")));
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["ECHO", "hi"]));
        assert_eq!(response, Some(Reply::bulk("hi")));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "key", "value"]));
        assert_eq!(response, Some(Reply::ok()));

        let response = handler.execute(make_command(&["GET", "key"]));
        assert_eq!(response, Some(Reply::bulk("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["GET", "nonexistent"]));
        assert_eq!(response, Some(Reply::Null));
    }

    #[test]
    fn test_case_insensitive_names() {
        let handler = create_handler();

        assert_eq!(
            handler.execute(make_command(&["set", "k", "v", "pX", "10000"])),
            Some(Reply::ok())
        );
        assert_eq!(
            handler.execute(make_command(&["gEt", "k"])),
            Some(Reply::bulk("v"))
        );
    }

    #[test]
    fn test_set_px_expires() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "session", "abc", "PX", "100"]));
        assert_eq!(
            handler.execute(make_command(&["GET", "session"])),
            Some(Reply::bulk("abc"))
        );

        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(
            handler.execute(make_command(&["GET", "session"])),
            Some(Reply::Null)
        );
        assert!(handler.store().is_empty());
    }

    #[test]
    fn test_set_without_px_clears_ttl() {
        let handler = create_handler();

        handler.execute(make_command(&["SET", "k", "v1", "PX", "10"]));
        handler.execute(make_command(&["SET", "k", "v2"]));

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(
            handler.execute(make_command(&["GET", "k"])),
            Some(Reply::bulk("v2"))
        );
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let handler = create_handler();
        assert_eq!(handler.execute(make_command(&["FLUSHALL"])), None);
        assert_eq!(handler.execute(make_command(&["DEL", "k"])), None);
    }

    #[test]
    fn test_malformed_arguments_are_ignored() {
        let handler = create_handler();

        assert_eq!(handler.execute(make_command(&["GET"])), None);
        assert_eq!(handler.execute(make_command(&["SET", "k"])), None);
        assert_eq!(
            handler.execute(make_command(&["SET", "k", "v", "PX", "abc"])),
            None
        );

        // Nothing was written
        assert!(handler.store().is_empty());
        assert_eq!(handler.store().stats().set_ops, 0);
    }

    #[test]
    fn test_ping_and_echo_do_not_touch_store() {
        let handler = create_handler();
        handler.execute(make_command(&["PING"]));
        handler.execute(make_command(&["ECHO", "x"]));

        let stats = handler.store().stats();
        assert_eq!(stats.get_ops, 0);
        assert_eq!(stats.set_ops, 0);
    }
}
