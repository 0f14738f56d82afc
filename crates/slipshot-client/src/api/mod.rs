//! API endpoint implementations.

mod auth;
mod dashboard;
mod slips;
mod tags;

pub use auth::AuthApi;
pub use dashboard::{DashboardApi, DashboardResource};
pub use slips::{SlipsApi, SlipsResource};
pub use tags::{TagsApi, TagsResource};

use serde::Serialize;

use crate::error::{ResourceError, ResourceResult};
use crate::transport::ApiRequest;

/// Attach a JSON body, reporting serialization failures as resource errors.
pub(crate) fn with_body<B: Serialize + ?Sized>(
    request: ApiRequest,
    body: &B,
) -> ResourceResult<ApiRequest> {
    request
        .with_json(body)
        .map_err(|e| ResourceError::InvalidRequest(e.to_string()))
}
