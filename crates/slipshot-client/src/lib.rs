//! Session-aware, caching HTTP client for the Slipshot backend.
//!
//! Requests go through a [`RequestExecutor`] that renews the session at most
//! once per request via a shared [`slipshot_session::RefreshCoordinator`].
//! Read-mostly resources sit behind a [`ResourceCache`] that de-duplicates
//! concurrent fetches and persists values in a TTL cache.
//!
//! # Example
//!
//! ```no_run
//! use slipshot_client::{DashboardQuery, PeriodType, SlipshotClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SlipshotClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//!
//! client.auth().login("alice", "secret").await?;
//!
//! // Served from cache on the second call.
//! let tags = client.tags().list().await?;
//! let tags_again = client.tags().list().await?;
//! assert_eq!(tags, tags_again);
//!
//! // Creating a tag invalidates tags, slips and the dashboard.
//! client.tags().create("groceries").await?;
//!
//! let month = DashboardQuery::new(PeriodType::Month, "2025-01");
//! let dashboard = client.dashboard().get(&month).await?;
//! println!("balance: {}", dashboard.balance);
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Auth**: login, logout, auth check, profile, explicit renewal
//! - **Tags**: cached list, get, create, rename, delete
//! - **Slips**: cached filtered lists, get, create, update, delete
//! - **Dashboard**: cached per-period aggregates, saved period preference

pub mod api;
pub mod client;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod resource;
pub mod transport;
pub mod types;

pub use client::{ClientBuilder, SlipshotClient};
pub use error::{Error, ResourceError, ResourceResult, Result};
pub use executor::{RETRY_BUDGET, RequestExecutor};
pub use outcome::{Failure, RequestOutcome};
pub use resource::{Invalidate, Resource, ResourceCache, SlotState};
pub use transport::{
    ApiRequest, HttpTransport, Method, RawResponse, ReqwestTransport, SharedTransport,
    TransportRenewer,
};
pub use types::*;
