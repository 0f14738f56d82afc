//! Request execution with one renewal-backed retry.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use slipshot_session::RefreshCoordinator;

use crate::outcome::RequestOutcome;
use crate::transport::{ApiRequest, SharedTransport};

/// Retries allowed after a successful renewal.
pub const RETRY_BUDGET: u32 = 1;

/// Executes API calls on behalf of the resource layer.
///
/// An unauthorized response triggers one renewal through the shared
/// [`RefreshCoordinator`]; the call is re-issued at most once. The executor
/// never redirects itself; that side effect belongs to the coordinator.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: SharedTransport,
    coordinator: Arc<RefreshCoordinator>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: SharedTransport, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// Perform one logical request.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> RequestOutcome<T> {
        if !self.coordinator.is_valid() {
            debug!(path = %request.path, "Session expired, request skipped");
            return RequestOutcome::unauthorized("Session expired");
        }

        let mut budget = RETRY_BUDGET;
        loop {
            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(method = %request.method, path = %request.path, error = %e, "Request failed without a response");
                    return RequestOutcome::connectivity(e.to_string());
                }
            };

            if !response.is_unauthorized() || budget == 0 {
                return RequestOutcome::from_response(response);
            }
            budget -= 1;

            debug!(path = %request.path, "Unauthorized, renewing session");
            if let Err(e) = self.coordinator.renew().await {
                debug!(path = %request.path, error = %e, "Renewal failed, not retrying");
                return RequestOutcome::unauthorized(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;
    use parking_lot::Mutex;

    use slipshot_session::{RedirectHook, RefreshConfig, RenewError, RenewalResponse, Renewer};

    use super::*;
    use crate::error::{Error, Result};
    use crate::transport::{HttpTransport, RawResponse};

    /// Answers 401 until the session has been renewed `renewals_needed` times.
    struct SessionServer {
        renewals: AtomicUsize,
        renewals_needed: usize,
        requests: AtomicUsize,
        always_unauthorized: bool,
        offline: bool,
    }

    impl SessionServer {
        fn new() -> Arc<Self> {
            Self::build(false, false)
        }

        fn build(always_unauthorized: bool, offline: bool) -> Arc<Self> {
            Arc::new(Self {
                renewals: AtomicUsize::new(0),
                renewals_needed: 1,
                requests: AtomicUsize::new(0),
                always_unauthorized,
                offline,
            })
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        fn renewals(&self) -> usize {
            self.renewals.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for SessionServer {
        async fn send(&self, _request: &ApiRequest) -> Result<RawResponse> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.offline {
                return Err(Error::Config("connection refused".to_string()));
            }
            if self.always_unauthorized || self.renewals() < self.renewals_needed {
                return Ok(RawResponse::new(401, r#"{"detail":"Token expired"}"#));
            }
            Ok(RawResponse::new(200, r#"[{"id":1,"name":"food"}]"#))
        }
    }

    struct ServerRenewer {
        server: Arc<SessionServer>,
        responses: Mutex<VecDeque<RenewalResponse>>,
    }

    #[async_trait]
    impl Renewer for ServerRenewer {
        async fn renew(&self) -> RenewalResponse {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let next = self.responses.lock().pop_front();
            let response = next.unwrap_or(RenewalResponse::Completed {
                status: 200,
                body: "{}".to_string(),
            });
            if matches!(response, RenewalResponse::Completed { status: 200, .. }) {
                self.server.renewals.fetch_add(1, Ordering::SeqCst);
            }
            response
        }
    }

    #[derive(Default)]
    struct CountingRedirect(AtomicUsize);

    impl RedirectHook for CountingRedirect {
        fn redirect_to_login(&self, _reason: &RenewError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn executor(
        server: Arc<SessionServer>,
        renewals: Vec<RenewalResponse>,
    ) -> (RequestExecutor, Arc<CountingRedirect>) {
        let redirect = Arc::new(CountingRedirect::default());
        let renewer = Arc::new(ServerRenewer {
            server: server.clone(),
            responses: Mutex::new(renewals.into()),
        });
        let coordinator = Arc::new(RefreshCoordinator::new(
            renewer,
            redirect.clone(),
            RefreshConfig::default(),
        ));
        (RequestExecutor::new(server, coordinator), redirect)
    }

    type Tags = Vec<serde_json::Value>;

    #[tokio::test(start_paused = true)]
    async fn test_renews_and_retries_once() {
        let server = SessionServer::new();
        let (executor, _) = executor(server.clone(), vec![]);

        let outcome: RequestOutcome<Tags> = executor.execute(&ApiRequest::get("tags/")).await;

        assert!(outcome.ok);
        assert_eq!(outcome.data.map(|d| d.len()), Some(1));
        assert_eq!(server.requests(), 2);
        assert_eq!(server.renewals(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_unauthorized_share_one_renewal() {
        let server = SessionServer::new();
        let (executor, _) = executor(server.clone(), vec![]);
        let request = ApiRequest::get("tags/");

        let outcomes: Vec<RequestOutcome<Tags>> =
            join_all((0..5).map(|_| executor.execute(&request))).await;

        assert!(outcomes.iter().all(|o| o.ok));
        assert_eq!(server.renewals(), 1);
        assert_eq!(executor.coordinator().snapshot().attempts, 1);
        assert_eq!(server.requests(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_once_ceiling() {
        let server = SessionServer::build(true, false);
        let (executor, redirect) = executor(server.clone(), vec![]);

        let outcome: RequestOutcome<Tags> = executor.execute(&ApiRequest::get("tags/")).await;

        assert!(outcome.is_unauthorized());
        assert_eq!(outcome.status, 401);
        assert_eq!(server.requests(), 2);
        assert_eq!(server.renewals(), 1);
        assert_eq!(redirect.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_renewal_failure_is_not_retried() {
        let server = SessionServer::new();
        let (executor, redirect) = executor(
            server.clone(),
            vec![RenewalResponse::Completed {
                status: 401,
                body: r#"{"error":"Refresh token has expired","code":"REFRESH_TOKEN_EXPIRED"}"#
                    .to_string(),
            }],
        );

        let outcome: RequestOutcome<Tags> = executor.execute(&ApiRequest::get("tags/")).await;
        assert!(outcome.is_unauthorized());
        assert_eq!(server.requests(), 1);
        assert_eq!(redirect.0.load(Ordering::SeqCst), 1);

        // The session is now expired: no further network traffic.
        let outcome: RequestOutcome<Tags> = executor.execute(&ApiRequest::get("slips/")).await;
        assert!(outcome.is_unauthorized());
        assert_eq!(server.requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_failure_is_distinct() {
        let server = SessionServer::build(false, true);
        let (executor, _) = executor(server.clone(), vec![]);

        let outcome: RequestOutcome<Tags> = executor.execute(&ApiRequest::get("tags/")).await;

        assert!(outcome.is_connectivity());
        assert!(!outcome.is_unauthorized());
        assert_eq!(outcome.status, 0);
        assert_eq!(executor.coordinator().snapshot().attempts, 0);
    }
}
