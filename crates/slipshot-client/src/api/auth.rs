//! Authentication API.
//!
//! Login and logout talk to the transport directly: they must work while
//! the session is expired, which the request executor refuses.

use tracing::{info, warn};

use slipshot_session::{RenewResult, SessionSnapshot};

use crate::client::SlipshotClient;
use crate::error::{ResourceError, ResourceResult};
use crate::outcome::RequestOutcome;
use crate::transport::{ApiRequest, RawResponse};
use crate::types::{AuthStatus, LoginRequest, LoginResponse, UserProfile};

use super::with_body;

const LOGIN_PATH: &str = "auth/token/cookie/";
const LOGOUT_PATH: &str = "auth/logout/";
const CHECK_PATH: &str = "auth/check/";
const PROFILE_PATH: &str = "users/me/";

/// Authentication API client.
pub struct AuthApi {
    client: SlipshotClient,
}

impl AuthApi {
    pub(crate) fn new(client: SlipshotClient) -> Self {
        Self { client }
    }

    /// Sign in with a username and password.
    ///
    /// On success the session coordinator is reset and every cached
    /// resource is dropped, since it belonged to the previous session.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ResourceResult<()> {
        let username = username.into();
        let request = with_body(
            ApiRequest::post(LOGIN_PATH),
            &LoginRequest {
                username: username.clone(),
                password: password.into(),
            },
        )?;

        let response = self.send_direct(&request).await?;
        let outcome = RequestOutcome::<LoginResponse>::from_response(response);
        if !outcome.ok {
            warn!(username = %username, status = outcome.status, "Login failed");
            return outcome.into_unit();
        }

        self.client.coordinator().reset();
        self.client.invalidate_all();
        info!(username = %username, "Logged in");
        Ok(())
    }

    /// Sign out and drop every cached resource.
    pub async fn logout(&self) -> ResourceResult<()> {
        let result = match self.send_direct(&ApiRequest::post(LOGOUT_PATH)).await {
            Ok(response) => RequestOutcome::<serde_json::Value>::from_response(response).into_unit(),
            Err(e) => Err(e),
        };
        self.client.invalidate_all();
        info!("Logged out");
        result
    }

    /// Ask the server whether the current credentials are accepted.
    ///
    /// A `401` is a normal answer here and does not trigger renewal.
    pub async fn check(&self) -> ResourceResult<AuthStatus> {
        let response = self.send_direct(&ApiRequest::get(CHECK_PATH)).await?;
        if response.is_unauthorized() {
            return serde_json::from_str(&response.body)
                .map_err(|e| ResourceError::Decode(e.to_string()));
        }
        RequestOutcome::from_response(response).into_result()
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> ResourceResult<UserProfile> {
        self.client.call(ApiRequest::get(PROFILE_PATH)).await
    }

    /// Renew the session explicitly, sharing any renewal in flight.
    pub async fn renew(&self) -> RenewResult {
        self.client.coordinator().renew().await
    }

    /// Whether the session can still be used or renewed.
    pub fn is_valid(&self) -> bool {
        self.client.coordinator().is_valid()
    }

    /// Coordinator state, for diagnostics.
    pub fn session(&self) -> SessionSnapshot {
        self.client.coordinator().snapshot()
    }

    async fn send_direct(&self, request: &ApiRequest) -> ResourceResult<RawResponse> {
        self.client
            .transport()
            .send(request)
            .await
            .map_err(|e| ResourceError::Connectivity(e.to_string()))
    }
}
