//! Configuration for the refresh coordinator.

use std::time::Duration;

/// Default minimum spacing between renewal attempts.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2_000);

/// Default number of consecutive failures before the session is expired.
pub const DEFAULT_MAX_FAILURES: u32 = 3;

/// Configuration for the refresh coordinator.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Minimum time between two renewal network calls.
    pub cooldown: Duration,

    /// Consecutive failures after which the session is forced into expiry.
    pub max_failures: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

impl RefreshConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cooldown between attempts.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the failure limit. Zero is treated as one.
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_failures = max.max(1);
        self
    }
}
