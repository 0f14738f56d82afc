//! Tags (categories) API.

use crate::client::SlipshotClient;
use crate::error::ResourceResult;
use crate::resource::{Resource, SlotState};
use crate::transport::ApiRequest;
use crate::types::{Tag, TagRequest};

use super::with_body;

/// The user's tag list.
pub struct TagsResource;

impl Resource for TagsResource {
    type Params = ();
    type Value = Vec<Tag>;
    const NAME: &'static str = "tags";

    fn params_key(_: &()) -> String {
        String::new()
    }

    fn request(_: &()) -> ApiRequest {
        ApiRequest::get("tags/")
    }
}

/// Tags API client.
///
/// Every mutation invalidates tags, slips and the dashboard, since slips
/// embed their tag and the dashboard breaks totals down by tag.
pub struct TagsApi {
    client: SlipshotClient,
}

impl TagsApi {
    pub(crate) fn new(client: SlipshotClient) -> Self {
        Self { client }
    }

    /// List tags, from cache when fresh.
    pub async fn list(&self) -> ResourceResult<Vec<Tag>> {
        self.client.inner().tags.get(&()).await
    }

    /// List tags from the network.
    pub async fn refresh(&self) -> ResourceResult<Vec<Tag>> {
        self.client.inner().tags.refresh(&()).await
    }

    /// Cached tag list, if any.
    pub fn cached(&self) -> Option<Vec<Tag>> {
        self.client.inner().tags.peek(&())
    }

    pub fn state(&self) -> SlotState {
        self.client.inner().tags.state(&())
    }

    /// Get a tag by ID.
    pub async fn get(&self, id: i64) -> ResourceResult<Tag> {
        self.client.call(ApiRequest::get(format!("tags/{}/", id))).await
    }

    /// Create a tag.
    pub async fn create(&self, name: impl Into<String>) -> ResourceResult<Tag> {
        let request = with_body(ApiRequest::post("tags/"), &TagRequest { name: name.into() })?;
        let result = self.client.call(request).await;
        self.client.invalidate_after_tag_change();
        result
    }

    /// Rename a tag.
    pub async fn rename(&self, id: i64, name: impl Into<String>) -> ResourceResult<Tag> {
        let request = with_body(
            ApiRequest::put(format!("tags/{}/", id)),
            &TagRequest { name: name.into() },
        )?;
        let result = self.client.call(request).await;
        self.client.invalidate_after_tag_change();
        result
    }

    /// Delete a tag.
    pub async fn delete(&self, id: i64) -> ResourceResult<()> {
        let result = self
            .client
            .call_unit(ApiRequest::delete(format!("tags/{}/", id)))
            .await;
        self.client.invalidate_after_tag_change();
        result
    }
}
