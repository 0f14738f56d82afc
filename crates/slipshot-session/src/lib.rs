//! Session renewal coordination for the Slipshot client.
//!
//! Many requests can fail authorization at the same moment when an access
//! credential lapses. This crate makes sure they trigger at most one renewal:
//!
//! - [`coordinator`] - single-flight renewal, cooldown, failure lockout, redirect debounce
//! - [`classify`] - table-driven mapping of renewal responses to terminal/transient failures
//! - [`renewer`] - seams for the renewal call and the redirect side effect
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slipshot_session::{LogRedirect, RefreshConfig, RefreshCoordinator};
//!
//! let coordinator = Arc::new(RefreshCoordinator::new(
//!     renewer,
//!     Arc::new(LogRedirect),
//!     RefreshConfig::default(),
//! ));
//! if coordinator.is_valid() {
//!     coordinator.renew().await?;
//! }
//! ```

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod renewer;

pub use classify::{Classification, FailureKind, classify};
pub use config::{DEFAULT_COOLDOWN, DEFAULT_MAX_FAILURES, RefreshConfig};
pub use coordinator::{RefreshCoordinator, SessionSnapshot};
pub use error::{RenewError, RenewResult};
pub use renewer::{
    LogRedirect, RedirectHook, RenewalResponse, Renewer, SharedRedirect, SharedRenewer,
};
