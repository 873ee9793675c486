//! TTL cache over a pluggable storage medium
//!
//! Entries are serialized as `{ value, stored_at }`. A stale entry is still
//! returned by [`CacheStore::get`] — staleness is a classification
//! ([`CacheStore::is_fresh`]), not an eviction policy, so callers can serve
//! last known data when the upstream is unavailable. Corrupt entries are
//! evicted on read and treated as misses.

pub mod storage;

pub use storage::{CacheStorage, MemoryStorage, SqliteStorage};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::logger::{self, LogTag};

/// A cached value and the moment it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.stored_at
    }
}

// Borrowing serializer so `put` does not need to clone the value.
#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    value: &'a T,
    stored_at: DateTime<Utc>,
}

pub struct CacheStore {
    storage: Arc<dyn CacheStorage>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// Read an entry. Missing, unparsable or corrupt entries return `None`;
    /// corrupt entries are evicted as a side effect.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = self.storage.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("evicting corrupt cache entry {}: {}", key, err),
                );
                if let Err(err) = self.storage.delete(key) {
                    logger::warning(LogTag::Cache, &format!("eviction failed for {}: {}", key, err));
                }
                None
            }
        }
    }

    /// Write an entry, stamping it with the current time. A storage failure
    /// is logged and swallowed: losing a cache write must not fail the fetch
    /// that produced the value.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let entry = CacheEntryRef {
            value,
            stored_at: Utc::now(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("failed to serialize cache entry {}: {}", key, err),
                );
                return;
            }
        };
        if let Err(err) = self.storage.write(key, &raw) {
            logger::warning(LogTag::Cache, &format!("cache write failed for {}: {}", key, err));
        }
    }

    /// Fresh iff the entry's age is below `ttl`.
    pub fn is_fresh<T>(&self, entry: &CacheEntry<T>, ttl: Duration) -> bool {
        // A negative age (clock adjustment) counts as fresh.
        entry.age().to_std().map_or(true, |age| age < ttl)
    }

    /// Remove an entry (explicit user-triggered refresh).
    pub fn invalidate(&self, key: &str) {
        if let Err(err) = self.storage.delete(key) {
            logger::warning(LogTag::Cache, &format!("invalidate failed for {}: {}", key, err));
        }
    }
}
