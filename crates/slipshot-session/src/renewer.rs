//! Seams between the coordinator and the outside world.
//!
//! The coordinator never talks HTTP or drives navigation itself: a
//! [`Renewer`] performs the renewal call and a [`RedirectHook`] sends the
//! user back to the login surface once the session is beyond recovery.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenewError;

/// Raw result of one renewal network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalResponse {
    /// The server answered.
    Completed { status: u16, body: String },
    /// No response reached the client.
    Unreachable { reason: String },
}

/// Performs the renewal network call.
#[async_trait]
pub trait Renewer: Send + Sync {
    /// Ask the server for a fresh session credential.
    async fn renew(&self) -> RenewalResponse;
}

/// Side effect fired once when the session becomes unrecoverable.
pub trait RedirectHook: Send + Sync {
    /// Send the user back to the login surface.
    fn redirect_to_login(&self, reason: &RenewError);
}

impl<F> RedirectHook for F
where
    F: Fn(&RenewError) + Send + Sync,
{
    fn redirect_to_login(&self, reason: &RenewError) {
        self(reason)
    }
}

/// Redirect hook that only logs; for headless consumers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRedirect;

impl RedirectHook for LogRedirect {
    fn redirect_to_login(&self, reason: &RenewError) {
        tracing::warn!(reason = %reason, "Session expired, login required");
    }
}

/// Shared renewer handle.
pub type SharedRenewer = Arc<dyn Renewer>;

/// Shared redirect hook handle.
pub type SharedRedirect = Arc<dyn RedirectHook>;
