//! Durable key-value store and TTL cache for the Slipshot client.
//!
//! This crate provides the storage leaves of the client layer:
//! - [`KvStore`] with in-memory and JSON-file backends
//! - [`TtlCache`] with lazy expiry and an optional sweep task
//! - [`PreferenceStore`] for user preferences kept next to the cache
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slipshot_cache::{CacheConfig, MemoryStore, TtlCache};
//!
//! let cache = TtlCache::new(Arc::new(MemoryStore::new()), CacheConfig::default());
//! cache.set("tags:", &vec!["food"], Duration::from_secs(600))?;
//! let tags: Option<Vec<String>> = cache.get("tags:");
//! ```

mod clock;
mod config;
mod error;
mod preferences;
mod store;
mod ttl;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_NAMESPACE, DEFAULT_TTL};
pub use error::{Error, Result};
pub use preferences::{PREFERENCES_KEY, PreferenceStore, Preferences, SavedPeriod};
pub use store::{FileStore, KvStore, MemoryStore, STORE_FILE, SharedStore};
pub use ttl::{CacheEntry, TtlCache};
