//! Storage Module
//!
//! The authoritative key-value store: a sharded map from key to
//! [`StoreEntry`], with expiry evaluated lazily whenever a key is touched.
//!
//! ## Features
//!
//! - **Sharded Storage**: independent `RwLock`s reduce contention between connections
//! - **TTL Support**: keys can carry a time-to-live in milliseconds
//! - **Lazy Expiry**: an expired entry is never returned and is removed on access
//!
//! ## Example
//!
//! ```
//! use ttlkv::storage::Store;
//! use std::time::Duration;
//!
//! let store = Store::new();
//! store.set("session", "abc123", Some(Duration::from_millis(100)));
//! assert_eq!(store.get("session"), Some("abc123".to_string()));
//!
//! std::thread::sleep(Duration::from_millis(150));
//! assert_eq!(store.get("session"), None);
//! ```

pub mod engine;

pub use engine::{Store, StoreEntry, StoreStats, DEFAULT_SHARDS};
