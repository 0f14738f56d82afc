//! Error types for session renewal.

use std::time::Duration;

use crate::classify::FailureKind;

/// Result of a renewal attempt, as observed by the leader and every waiter.
pub type RenewResult = std::result::Result<(), RenewError>;

/// Reasons a renewal did not produce a fresh session.
///
/// `Clone` so a single outcome can be broadcast to every queued caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewError {
    /// The session is already expired; no network call was made.
    #[error("Session expired, login required")]
    SessionExpired,

    /// A renewal was attempted too recently; no network call was made.
    #[error("Renewal cooldown active, retry in {remaining:?}")]
    Cooldown { remaining: Duration },

    /// The server rejected the credential for good (expired, revoked, missing).
    #[error("Renewal rejected: {0}")]
    Rejected(FailureKind),

    /// The renewal failed but may succeed later (invalid response, network).
    #[error("Renewal failed: {0}")]
    Failed(FailureKind),

    /// Too many consecutive failures; the session was forced into expiry.
    #[error("Renewal failed {failures} times in a row, session expired")]
    FailureLimit { failures: u32 },

    /// The renewal was cancelled before it settled.
    #[error("Renewal abandoned before completion")]
    Abandoned,
}

impl RenewError {
    /// Whether retrying without a fresh interactive login is pointless.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenewError::SessionExpired | RenewError::Rejected(_) | RenewError::FailureLimit { .. }
        )
    }
}
