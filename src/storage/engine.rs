//! Thread-Safe Key-Value Store with Expiry Support
//!
//! This module implements the store every connection shares. It maps string
//! keys to string values, each with an optional absolute expiry instant.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independent `RwLock`ed shards.
//! 2. **Lazy Expiry**: Expiry is checked when a key is accessed. There is no
//!    background sweeper; enumeration purges whatever it finds expired.
//! 3. **One Clock Sample**: Each operation reads `Instant::now()` once and uses
//!    it for every decision it makes.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always lives in the same shard, so every single-key operation runs
//! under exactly one lock and is atomic with respect to other callers.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 16;

/// A stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// The stored value
    pub value: String,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl StoreEntry {
    /// Creates an entry expiring `ttl` after `now`.
    ///
    /// A TTL too large to represent as an `Instant` never expires.
    pub fn new(value: String, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// An entry is expired from its deadline onwards.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }

    /// Time left before expiry, or None if the entry never expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, StoreEntry>>,
}

impl Shard {
    // A panic while holding the lock cannot leave a half-written entry behind
    // (inserts and removals are single HashMap calls), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoreEntry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoreEntry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The key-value store shared by all connections.
///
/// Wrap it in an `Arc` and hand a clone to each connection task.
///
/// # Example
///
/// ```
/// use ttlkv::storage::Store;
/// use std::time::Duration;
///
/// let store = Store::new();
///
/// store.set("name", "Ariz", None);
/// assert_eq!(store.get("name"), Some("Ariz".to_string()));
///
/// store.set("session", "abc123", Some(Duration::from_secs(60)));
/// assert!(store.contains_key("session"));
/// ```
pub struct Store {
    shards: Vec<Shard>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,

    /// Statistics: expired entries removed, lazily or by a purge
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("shards", &self.shards.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates an empty store with `shards` shards (at least one).
    pub fn with_shards(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Shard::default()).collect(),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Inserts or overwrites a key.
    ///
    /// With `Some(ttl)` the key expires `ttl` from now; with `None` it never
    /// expires. Any expiry of a previous value is replaced.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let key = key.into();
        let entry = StoreEntry::new(value.into(), ttl, Instant::now());
        self.shard(&key).write().insert(key, entry);
    }

    /// Returns the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired; an expired
    /// entry is removed on the way.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, |entry| entry.value.clone())
    }

    /// Checks whether a live entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key, |_| ()).is_some()
    }

    /// Remaining time to live of a key.
    ///
    /// `None` if the key is absent; `Some(None)` if it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        self.lookup_at(key, now, |entry| entry.remaining(now))
    }

    /// Removes a key.
    ///
    /// Returns `true` if a live entry was removed. Removing a missing key is
    /// not an error.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        match self.shard(key).write().remove(key) {
            Some(entry) if entry.is_expired_at(now) => {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn lookup<T>(&self, key: &str, f: impl Fn(&StoreEntry) -> T) -> Option<T> {
        self.lookup_at(key, Instant::now(), f)
    }

    fn lookup_at<T>(&self, key: &str, now: Instant, f: impl Fn(&StoreEntry) -> T) -> Option<T> {
        let shard = self.shard(key);

        // Fast path: read lock for missing or live keys
        {
            let data = shard.read();
            match data.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(f(entry)),
                Some(_) => {}
            }
        }

        // Expired - take the write lock to remove it
        let mut data = shard.write();
        match data.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            // Replaced by a concurrent SET between the two locks
            Some(entry) => Some(f(entry)),
            None => None,
        }
    }

    /// Returns every live key, purging expired entries while scanning.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys = Vec::new();
        let mut expired = 0u64;

        for shard in &self.shards {
            let mut data = shard.write();
            let before = data.len();
            data.retain(|_, entry| !entry.is_expired_at(now));
            expired += (before - data.len()) as u64;
            keys.extend(data.keys().cloned());
        }

        if expired > 0 {
            self.expired_count.fetch_add(expired, Ordering::Relaxed);
        }
        keys
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut purged = 0u64;

        for shard in &self.shards {
            let mut data = shard.write();
            let before = data.len();
            data.retain(|_, entry| !entry.is_expired_at(now));
            purged += (before - data.len()) as u64;
        }

        if purged > 0 {
            self.expired_count.fetch_add(purged, Ordering::Relaxed);
        }
        purged
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|entry| !entry.is_expired_at(now))
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of live keys
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Total expired entries removed
    pub expired: u64,
}
