//! Slips (transactions) API.

use crate::client::SlipshotClient;
use crate::error::ResourceResult;
use crate::resource::{Resource, SlotState};
use crate::transport::ApiRequest;
use crate::types::{CreateSlipRequest, Slip, SlipQuery, UpdateSlipRequest};

use super::with_body;

/// Slip lists, one slot per filter combination.
pub struct SlipsResource;

impl Resource for SlipsResource {
    type Params = SlipQuery;
    type Value = Vec<Slip>;
    const NAME: &'static str = "slips";

    fn params_key(query: &SlipQuery) -> String {
        query
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn request(query: &SlipQuery) -> ApiRequest {
        ApiRequest::get("slips/").with_query(query.to_pairs())
    }
}

/// Slips API client.
///
/// Every mutation invalidates slips and the dashboard.
pub struct SlipsApi {
    client: SlipshotClient,
}

impl SlipsApi {
    pub(crate) fn new(client: SlipshotClient) -> Self {
        Self { client }
    }

    /// List slips matching `query`, from cache when fresh.
    pub async fn list(&self, query: &SlipQuery) -> ResourceResult<Vec<Slip>> {
        self.client.inner().slips.get(query).await
    }

    /// List all slips.
    pub async fn list_all(&self) -> ResourceResult<Vec<Slip>> {
        self.list(&SlipQuery::default()).await
    }

    /// List slips matching `query` from the network.
    pub async fn refresh(&self, query: &SlipQuery) -> ResourceResult<Vec<Slip>> {
        self.client.inner().slips.refresh(query).await
    }

    pub fn cached(&self, query: &SlipQuery) -> Option<Vec<Slip>> {
        self.client.inner().slips.peek(query)
    }

    pub fn state(&self, query: &SlipQuery) -> SlotState {
        self.client.inner().slips.state(query)
    }

    /// Get a slip by ID.
    pub async fn get(&self, id: i64) -> ResourceResult<Slip> {
        self.client.call(ApiRequest::get(format!("slips/{}/", id))).await
    }

    /// Record a slip.
    pub async fn create(&self, request: CreateSlipRequest) -> ResourceResult<Slip> {
        let request = with_body(ApiRequest::post("slips/"), &request)?;
        let result = self.client.call(request).await;
        self.client.invalidate_after_slip_change();
        result
    }

    /// Update some fields of a slip.
    pub async fn update(&self, id: i64, request: UpdateSlipRequest) -> ResourceResult<Slip> {
        let request = with_body(ApiRequest::patch(format!("slips/{}/", id)), &request)?;
        let result = self.client.call(request).await;
        self.client.invalidate_after_slip_change();
        result
    }

    /// Delete a slip.
    pub async fn delete(&self, id: i64) -> ResourceResult<()> {
        let result = self
            .client
            .call_unit(ApiRequest::delete(format!("slips/{}/", id)))
            .await;
        self.client.invalidate_after_slip_change();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlipType;

    #[test]
    fn test_params_key_is_stable() {
        assert_eq!(SlipsResource::params_key(&SlipQuery::default()), "");

        let query = SlipQuery {
            tag: Some(4),
            slip_type: Some(SlipType::Expense),
            ..Default::default()
        };
        assert_eq!(SlipsResource::params_key(&query), "tag=4&type=expense");
    }
}
