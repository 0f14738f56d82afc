//! Configuration types.
//!
//! ```toml
//! [server]
//! base_url = "https://slipshot-backend.onrender.com"
//! timeout_secs = 30
//!
//! [session]
//! cooldown_ms = 2000
//! max_failures = 3
//!
//! [cache]
//! ttl_secs = 600
//! store = "file"
//! sweep_interval_secs = 60
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Durable key of the saved preferences; cache namespaces must not cover it.
pub const PREFERENCES_KEY: &str = "slipshot:preferences";

/// Root configuration. Each section is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlipshotConfig {
    /// Backend connection settings.
    pub server: Option<ServerSection>,

    /// Session renewal settings.
    pub session: Option<SessionSection>,

    /// Resource cache settings.
    pub cache: Option<CacheSection>,
}

impl SlipshotConfig {
    /// Create an empty config (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: SlipshotConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
    }

    /// Server section with defaults applied.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// Session section with defaults applied.
    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Cache section with defaults applied.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Check values that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        if !(server.base_url.starts_with("http://") || server.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "server.base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", server.base_url),
            });
        }
        if server.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "server.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.session().max_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_failures".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let cache = self.cache();
        if PREFERENCES_KEY.starts_with(&cache.namespace) {
            return Err(ConfigError::Invalid {
                field: "cache.namespace".to_string(),
                reason: format!(
                    "'{}' would cover the preferences key '{}'",
                    cache.namespace, PREFERENCES_KEY
                ),
            });
        }
        if cache.store == StoreBackend::File && cache.store_path.is_none() && dirs::data_dir().is_none() {
            return Err(ConfigError::Invalid {
                field: "cache.store_path".to_string(),
                reason: "no platform data directory; set an explicit path".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Backend origin, e.g. `https://slipshot-backend.onrender.com`.
    pub base_url: String,

    /// Path prefix of the REST API under the origin.
    pub api_prefix: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "api/".to_string(),
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl ServerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session renewal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Minimum spacing between renewal attempts, in milliseconds.
    pub cooldown_ms: u64,

    /// Consecutive renewal failures before the session is expired.
    pub max_failures: u32,

    /// Renewal endpoint, relative to the API prefix.
    pub refresh_path: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            cooldown_ms: 2_000,
            max_failures: 3,
            refresh_path: "auth/token/refresh/".to_string(),
        }
    }
}

impl SessionSection {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Which durable store backs the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Entries live only as long as the process.
    #[default]
    Memory,
    /// Entries persist in a JSON file.
    File,
}

/// Resource cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Key prefix for cache entries.
    pub namespace: String,

    /// Lifetime of cached resources, in seconds.
    pub ttl_secs: u64,

    /// Store backend.
    pub store: StoreBackend,

    /// Store file path for the `file` backend.
    /// Default: `<data dir>/slipshot/store.json`
    pub store_path: Option<PathBuf>,

    /// Run a periodic sweep of expired entries at this interval.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            namespace: "slipshot:cache:".to_string(),
            ttl_secs: 600,
            store: StoreBackend::Memory,
            store_path: None,
            sweep_interval_secs: None,
        }
    }
}

impl CacheSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Resolved store file path for the `file` backend.
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(crate::APP_NAME).join("store.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SlipshotConfig::from_toml("").unwrap();
        assert_eq!(config.server().base_url, "http://localhost:8000");
        assert_eq!(config.session().cooldown(), Duration::from_millis(2_000));
        assert_eq!(config.session().max_failures, 3);
        assert_eq!(config.cache().ttl(), Duration::from_secs(600));
        assert_eq!(config.cache().store, StoreBackend::Memory);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_sections() {
        let config = SlipshotConfig::from_toml(
            r#"
[server]
base_url = "https://slipshot-backend.onrender.com"

[cache]
store = "file"
store_path = "/tmp/slipshot.json"
"#,
        )
        .unwrap();

        let server = config.server();
        assert_eq!(server.base_url, "https://slipshot-backend.onrender.com");
        assert_eq!(server.timeout_secs, 30);
        assert_eq!(config.cache().store, StoreBackend::File);
        assert_eq!(
            config.cache().resolved_store_path(),
            Some(PathBuf::from("/tmp/slipshot.json"))
        );
    }

    #[test]
    fn test_merge_overrides_whole_sections() {
        let mut base = SlipshotConfig::from_toml("[session]\ncooldown_ms = 500\n").unwrap();
        let overlay = SlipshotConfig::from_toml("[server]\nbase_url = \"https://x.test\"\n").unwrap();

        base.merge(overlay);
        assert_eq!(base.server().base_url, "https://x.test");
        assert_eq!(base.session().cooldown_ms, 500);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = SlipshotConfig::from_toml("[server]\nbase_url = \"ftp://nope\"\n").unwrap();
        assert!(matches!(bad_url.validate(), Err(ConfigError::Invalid { .. })));

        let zero = SlipshotConfig::from_toml("[session]\nmax_failures = 0\n").unwrap();
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_namespace_covering_preferences() {
        for namespace in ["", "slipshot:", "slipshot:pref", "slipshot:preferences"] {
            let config = SlipshotConfig {
                cache: Some(CacheSection {
                    namespace: namespace.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            };
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "cache.namespace"),
                other => panic!("namespace {namespace:?} accepted: {other:?}"),
            }
        }

        let custom = SlipshotConfig::from_toml("[cache]\nnamespace = \"work:cache:\"\n").unwrap();
        assert!(custom.validate().is_ok());
        assert!(SlipshotConfig::new().validate().is_ok());
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = SlipshotConfig::new();
        config.cache = Some(CacheSection {
            sweep_interval_secs: Some(30),
            ..Default::default()
        });

        let text = config.to_toml().unwrap();
        assert_eq!(SlipshotConfig::from_toml(&text).unwrap(), config);
    }
}
