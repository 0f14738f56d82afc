//! End-to-end session behavior against a mock backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use slipshot_client::{DashboardQuery, PeriodType, ResourceError, SlipQuery, SlipshotClient};
use slipshot_session::RenewError;

/// Answers 401 until the shared flag is set by a renewal.
struct RequiresRenewal {
    renewed: Arc<AtomicBool>,
    body: serde_json::Value,
}

impl Respond for RequiresRenewal {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.renewed.load(Ordering::SeqCst) {
            ResponseTemplate::new(200).set_body_json(self.body.clone())
        } else {
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}))
        }
    }
}

/// Renewal endpoint that flips the flag.
struct Renews {
    renewed: Arc<AtomicBool>,
}

impl Respond for Renews {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.renewed.store(true, Ordering::SeqCst);
        ResponseTemplate::new(200)
            .set_body_json(json!({"detail": "Token refreshed", "authenticated": true}))
            .set_delay(Duration::from_millis(100))
    }
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"}))
}

fn client_for(server: &MockServer) -> SlipshotClient {
    SlipshotClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn counting_client(server: &MockServer) -> (SlipshotClient, Arc<AtomicUsize>) {
    let redirects = Arc::new(AtomicUsize::new(0));
    let counter = redirects.clone();
    let client = SlipshotClient::builder()
        .base_url(server.uri())
        .on_session_expired(Arc::new(move |_: &RenewError| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();
    (client, redirects)
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_renewal() {
    let server = MockServer::start().await;
    let renewed = Arc::new(AtomicBool::new(false));

    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(Renews {
            renewed: renewed.clone(),
        })
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .respond_with(RequiresRenewal {
            renewed: renewed.clone(),
            body: json!([{"id": 1, "name": "food"}]),
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slips/"))
        .respond_with(RequiresRenewal {
            renewed: renewed.clone(),
            body: json!([]),
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(RequiresRenewal {
            renewed: renewed.clone(),
            body: json!({"id": 3, "username": "alice"}),
        })
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (tags_api, slips_api, auth_api) = (client.tags(), client.slips(), client.auth());
    let (tags, slips, me) = tokio::join!(
        tags_api.list(),
        slips_api.list_all(),
        auth_api.me(),
    );

    assert_eq!(tags.unwrap()[0].name, "food");
    assert!(slips.unwrap().is_empty());
    assert_eq!(me.unwrap().username, "alice");

    let session = client.session();
    assert_eq!(session.attempts, 1);
    assert_eq!(session.consecutive_failures, 0);
    assert!(!session.is_refreshing);
}

#[tokio::test]
async fn request_is_retried_at_most_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;

    let (client, redirects) = counting_client(&server);
    let error = client.auth().me().await.unwrap_err();

    assert!(error.is_unauthorized());
    assert_eq!(redirects.load(Ordering::SeqCst), 0);
    assert!(client.coordinator().is_valid());
}

#[tokio::test]
async fn terminal_renewal_failure_redirects_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Refresh token has expired", "code": "REFRESH_TOKEN_EXPIRED"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    for endpoint in ["/api/tags/", "/api/slips/", "/api/dashboard/"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(unauthorized())
            .expect(1)
            .mount(&server)
            .await;
    }

    let (client, redirects) = counting_client(&server);
    let query = DashboardQuery::new(PeriodType::Month, "2025-01");
    let (tags_api, slips_api, dashboard_api) = (client.tags(), client.slips(), client.dashboard());
    let (tags, slips, dashboard) = tokio::join!(
        tags_api.list(),
        slips_api.list_all(),
        dashboard_api.get(&query),
    );

    assert!(tags.unwrap_err().is_unauthorized());
    assert!(slips.unwrap_err().is_unauthorized());
    assert!(dashboard.unwrap_err().is_unauthorized());
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
    assert!(!client.coordinator().is_valid());

    // Expired: refused locally, no traffic.
    assert!(client.tags().refresh().await.unwrap_err().is_unauthorized());
    assert_eq!(client.auth().renew().await, Err(RenewError::SessionExpired));
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn login_restores_an_expired_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Refresh token not found", "code": "REFRESH_TOKEN_MISSING"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/cookie/"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": true})))
        .expect(1)
        .mount(&server)
        .await;

    let renewed = Arc::new(AtomicBool::new(false));
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .respond_with(RequiresRenewal {
            renewed: renewed.clone(),
            body: json!([{"id": 2, "name": "rent"}]),
        })
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.tags().list().await.unwrap_err().is_unauthorized());
    assert!(!client.coordinator().is_valid());

    // The login cookie makes the backend accept requests again.
    renewed.store(true, Ordering::SeqCst);
    client.auth().login("alice", "secret").await.unwrap();

    assert!(client.coordinator().is_valid());
    assert_eq!(client.session().consecutive_failures, 0);
    assert_eq!(client.tags().list().await.unwrap()[0].name, "rent");
}

#[tokio::test]
async fn suspended_account_is_a_resource_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/cookie/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"detail": "Account suspended", "code": "ACCOUNT_SUSPENDED"}),
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.auth().login("bob", "pw").await.unwrap_err();

    assert_eq!(
        error,
        ResourceError::Rejected {
            status: 403,
            message: "Account suspended".to_string()
        }
    );
    assert_eq!(client.session().attempts, 0);
}

#[tokio::test]
async fn unreachable_backend_is_a_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = SlipshotClient::builder()
        .base_url(format!("http://127.0.0.1:{}", port))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let error = client.slips().list(&SlipQuery::default()).await.unwrap_err();
    assert!(error.is_connectivity());
    assert!(!error.is_unauthorized());
    assert_eq!(client.session().attempts, 0);
    assert!(client.coordinator().is_valid());
}
