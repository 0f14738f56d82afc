//! TTL cache layered over a durable [`KvStore`].
//!
//! Every entry records when it was written and how long it lives. Expiry is
//! evaluated lazily on read: an expired entry is deleted and reported as
//! absent, so a read never returns stale data. [`TtlCache::sweep_expired`]
//! reclaims space for entries nobody reads again; correctness never depends
//! on it running.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::clock::{SharedClock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::store::SharedStore;

/// Entry persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub data: T,

    /// Wall-clock write time in milliseconds since the UNIX epoch.
    pub written_at: u64,

    /// Lifetime in milliseconds.
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    /// Create an entry written at `now_ms`.
    pub fn new(data: T, now_ms: u64, ttl: Duration) -> Self {
        Self {
            data,
            written_at: now_ms,
            ttl_ms: duration_ms(ttl),
        }
    }

    /// Whether the entry is past its lifetime at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        is_expired(self.written_at, self.ttl_ms, now_ms)
    }

    /// Milliseconds of life left at `now_ms` (zero once expired).
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        (self.written_at.saturating_add(self.ttl_ms)).saturating_sub(now_ms)
    }
}

/// Expiry header shared by every entry, read without knowing the payload type.
#[derive(Deserialize)]
struct EntryHeader {
    written_at: u64,
    ttl_ms: u64,
}

fn is_expired(written_at: u64, ttl_ms: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(written_at) >= ttl_ms
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Namespaced TTL cache.
///
/// Cheap to clone; clones share the same store and clock.
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: SharedStore,
    clock: SharedClock,
    config: CacheConfig,
}

impl TtlCache {
    /// Create a cache over `store` using the system clock.
    pub fn new(store: SharedStore, config: CacheConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Create a cache with an explicit clock.
    pub fn with_clock(store: SharedStore, clock: SharedClock, config: CacheConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the clock used for timestamps.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Get the backing store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Current time according to the cache clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    /// Read a value, treating expired or unreadable entries as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Read the full entry (value plus timestamps).
    ///
    /// An expired entry is deleted as a side effect. Data that does not
    /// parse as a `CacheEntry<T>` is reported as a miss and left alone.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let full_key = self.full_key(key);

        let raw = match self.store.get(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                trace!(key = %full_key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %full_key, error = %e, "Malformed cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_expired(self.clock.now_ms()) {
            debug!(key = %full_key, "Cache entry expired, removing");
            if let Err(e) = self.store.remove(&full_key) {
                warn!(key = %full_key, error = %e, "Failed to remove expired cache entry");
            }
            return None;
        }

        trace!(key = %full_key, "Cache hit");
        Some(entry)
    }

    /// Write a value with an explicit lifetime, overwriting any previous entry.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);
        let raw = serde_json::to_string(&entry)?;
        let full_key = self.full_key(key);
        self.store.set(&full_key, &raw)?;
        trace!(key = %full_key, ttl_ms = entry.ttl_ms, "Cache entry written");
        Ok(())
    }

    /// Write a value with the configured default lifetime.
    pub fn set_default<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        self.set(key, data, self.config.default_ttl)
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.full_key(key))
    }

    /// Remove every entry whose key (within the namespace) starts with `prefix`.
    pub fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let removed = self.store.remove_prefix(&self.full_key(prefix))?;
        debug!(prefix = %prefix, removed, "Cleared cache entries by prefix");
        Ok(removed)
    }

    /// Remove every entry in the cache namespace.
    pub fn clear(&self) -> Result<usize> {
        self.clear_prefix("")
    }

    /// Remove every expired entry in the namespace and return how many were removed.
    ///
    /// Entries that cannot be parsed are left untouched.
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for full_key in self.store.keys()? {
            if !full_key.starts_with(&self.config.namespace) {
                continue;
            }
            let Some(raw) = self.store.get(&full_key)? else {
                continue;
            };
            if let Ok(header) = serde_json::from_str::<EntryHeader>(&raw)
                && is_expired(header.written_at, header.ttl_ms, now)
            {
                self.store.remove(&full_key)?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(count = removed, "Swept expired cache entries");
        }

        Ok(removed)
    }

    /// Spawn a background task sweeping expired entries every `sweep_interval`.
    ///
    /// Must be called from within a tokio runtime. Abort the returned handle
    /// to stop the task.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = cache.sweep_expired() {
                    warn!(error = %e, "Cache sweep failed");
                }
            }
        })
    }
}
