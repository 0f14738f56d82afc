//! User preferences persisted alongside the cache.
//!
//! Preferences live under a single store key outside the cache namespace,
//! so clearing the cache (for example on logout) leaves them in place.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::store::SharedStore;

/// Store key holding the serialized preferences.
pub const PREFERENCES_KEY: &str = "slipshot:preferences";

/// Dashboard period remembered between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPeriod {
    /// One of `day`, `week`, `month`, `year`.
    pub period_type: String,
    /// Period value such as `2025-01` (month) or `2025` (year).
    pub period_value: Option<String>,
}

/// Persisted user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// UI theme name (`light`, `dark`, ...).
    pub theme: Option<String>,
    /// Preferred language tag.
    pub language: Option<String>,
    /// Last dashboard period viewed.
    pub dashboard_period: Option<SavedPeriod>,
}

/// Reads and writes [`Preferences`] in a durable store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    store: SharedStore,
}

impl PreferenceStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load preferences, falling back to defaults when absent or unreadable.
    pub fn load(&self) -> Preferences {
        match self.store.get(PREFERENCES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(error = %e, "Ignoring unreadable preferences");
                Preferences::default()
            }),
            Ok(None) => Preferences::default(),
            Err(e) => {
                debug!(error = %e, "Preferences unavailable, using defaults");
                Preferences::default()
            }
        }
    }

    /// Persist preferences.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let raw = serde_json::to_string(prefs)?;
        self.store.set(PREFERENCES_KEY, &raw)
    }

    /// Load, modify, and save in one step.
    pub fn update<F>(&self, f: F) -> Result<Preferences>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut prefs = self.load();
        f(&mut prefs);
        self.save(&prefs)?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::{KvStore, MemoryStore};

    #[test]
    fn test_defaults_when_absent() {
        let prefs = PreferenceStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.load(), Preferences::default());
    }

    #[test]
    fn test_update_persists() {
        let store = Arc::new(MemoryStore::new());
        let prefs = PreferenceStore::new(store.clone());

        prefs
            .update(|p| {
                p.theme = Some("dark".to_string());
                p.dashboard_period = Some(SavedPeriod {
                    period_type: "month".to_string(),
                    period_value: Some("2025-01".to_string()),
                });
            })
            .unwrap();

        let reloaded = PreferenceStore::new(store).load();
        assert_eq!(reloaded.theme.as_deref(), Some("dark"));
        assert_eq!(
            reloaded.dashboard_period.unwrap().period_value.as_deref(),
            Some("2025-01")
        );
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(PREFERENCES_KEY, r#"{"language":"th"}"#).unwrap();

        let prefs = PreferenceStore::new(store).load();
        assert_eq!(prefs.language.as_deref(), Some("th"));
        assert_eq!(prefs.theme, None);
    }
}
