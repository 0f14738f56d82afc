//! Configuration for the TTL cache.

use std::time::Duration;

/// Default key prefix for cache entries in the durable store.
pub const DEFAULT_NAMESPACE: &str = "slipshot:cache:";

/// Default lifetime of a cached resource (10 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Configuration for the TTL cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix applied to every key written by the cache.
    pub namespace: String,

    /// Lifetime used when callers don't pass one explicitly.
    pub default_ttl: Duration,

    /// Whether to run a periodic sweep of expired entries.
    /// If false, expired entries are only removed when read.
    pub enable_sweep_task: bool,

    /// Interval for the sweep task (if enabled).
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl: DEFAULT_TTL,
            enable_sweep_task: false,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the default entry lifetime.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Enable or disable the background sweep task.
    pub fn with_sweep_task(mut self, enabled: bool) -> Self {
        self.enable_sweep_task = enabled;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
