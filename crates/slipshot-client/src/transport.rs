//! HTTP transport.
//!
//! Everything above this module works on [`ApiRequest`] descriptors and
//! [`RawResponse`] values, so tests can swap the network for a script.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::trace;
use url::Url;

use slipshot_session::{RenewalResponse, Renewer};

use crate::error::{Error, Result};

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Whether the call changes server state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Method::Get)
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

/// Descriptor of one API call, relative to the API root.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path under the API root, e.g. `tags/` or `slips/12/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append query parameters.
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Status and body of a response that reached the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends API calls.
///
/// `Err` means no response reached the client; every HTTP status,
/// including errors, comes back as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn HttpTransport>;

/// reqwest-backed transport with a cookie jar for the session credentials.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    api_root: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport rooted at `base_url` + `api_prefix`.
    pub fn new(
        base_url: &str,
        api_prefix: &str,
        timeout: Duration,
        user_agent: Option<String>,
    ) -> Result<Self> {
        let api_root = api_root(base_url, api_prefix)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent =
            user_agent.unwrap_or_else(|| format!("slipshot-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            api_root,
            timeout,
        })
    }

    /// Root URL all request paths are joined to.
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.api_root
            .join(path.trim_start_matches('/'))
            .map_err(Error::from)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = self.url(&request.path)?;
        trace!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .http
            .request(request.method.as_reqwest(), url)
            .timeout(self.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Join `api_prefix` onto `base_url`, normalizing slashes.
fn api_root(base_url: &str, api_prefix: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }

    let prefix = api_prefix.trim_matches('/');
    if prefix.is_empty() {
        return Ok(base);
    }
    Ok(base.join(&format!("{}/", prefix))?)
}

/// [`Renewer`] that posts to the renewal endpoint through a transport.
///
/// Shares the transport's cookie jar, so the renewed credential is picked
/// up by every later request.
pub struct TransportRenewer {
    transport: SharedTransport,
    path: String,
}

impl TransportRenewer {
    pub fn new(transport: SharedTransport, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

#[async_trait]
impl Renewer for TransportRenewer {
    async fn renew(&self) -> RenewalResponse {
        match self.transport.send(&ApiRequest::post(self.path.clone())).await {
            Ok(response) => RenewalResponse::Completed {
                status: response.status,
                body: response.body,
            },
            Err(e) => RenewalResponse::Unreachable {
                reason: e.to_string(),
            },
        }
    }
}
