//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use slipshot_cache::{
    CacheConfig, FileStore, MemoryStore, PREFERENCES_KEY, PreferenceStore, SharedClock,
    SharedStore, SystemClock, TtlCache,
};
use slipshot_config::{SlipshotConfig, StoreBackend};
use slipshot_session::{LogRedirect, RefreshConfig, RefreshCoordinator, SessionSnapshot, SharedRedirect};

use crate::api::{
    AuthApi, DashboardApi, DashboardResource, SlipsApi, SlipsResource, TagsApi, TagsResource,
};
use crate::error::{Error, ResourceResult, Result};
use crate::executor::RequestExecutor;
use crate::outcome::RequestOutcome;
use crate::resource::ResourceCache;
use crate::transport::{ApiRequest, ReqwestTransport, SharedTransport, TransportRenewer};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default path prefix of the REST API.
const DEFAULT_API_PREFIX: &str = "api/";

/// Default renewal endpoint, relative to the API root.
const DEFAULT_REFRESH_PATH: &str = "auth/token/refresh/";

/// Slipshot API client.
///
/// One client is one session context: it owns the refresh coordinator,
/// the request executor and the resource caches, and clones share them.
///
/// # Example
///
/// ```no_run
/// use slipshot_client::SlipshotClient;
///
/// # async fn example() -> slipshot_client::Result<()> {
/// let client = SlipshotClient::builder()
///     .base_url("http://localhost:8000")
///     .build()?;
///
/// client.auth().login("alice", "secret").await.ok();
/// let tags = client.tags().list().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SlipshotClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) transport: SharedTransport,
    pub(crate) executor: RequestExecutor,
    pub(crate) cache: TtlCache,
    pub(crate) preferences: PreferenceStore,
    pub(crate) tags: ResourceCache<TagsResource>,
    pub(crate) slips: ResourceCache<SlipsResource>,
    pub(crate) dashboard: ResourceCache<DashboardResource>,
}

impl std::fmt::Debug for SlipshotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlipshotClient")
            .field("executor", &self.inner.executor)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

impl SlipshotClient {
    /// Get access to the inner client state (for API implementations).
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the tags API.
    pub fn tags(&self) -> TagsApi {
        TagsApi::new(self.clone())
    }

    /// Access the slips API.
    pub fn slips(&self) -> SlipsApi {
        SlipsApi::new(self.clone())
    }

    /// Access the dashboard API.
    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.clone())
    }

    /// User preferences stored next to the cache.
    pub fn preferences(&self) -> &PreferenceStore {
        &self.inner.preferences
    }

    /// The durable TTL cache backing the resource caches.
    pub fn cache(&self) -> &TtlCache {
        &self.inner.cache
    }

    /// The session coordinator shared by every request of this client.
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        self.inner.executor.coordinator()
    }

    /// Coordinator state, for diagnostics.
    pub fn session(&self) -> SessionSnapshot {
        self.coordinator().snapshot()
    }

    pub(crate) fn transport(&self) -> &SharedTransport {
        &self.inner.transport
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop every cached resource, in memory and durable.
    ///
    /// Preferences are kept.
    pub fn invalidate_all(&self) {
        self.inner.tags.invalidate();
        self.inner.slips.invalidate();
        self.inner.dashboard.invalidate();
        match self.inner.cache.clear() {
            Ok(removed) => debug!(removed, "Cache cleared"),
            Err(e) => warn!(error = %e, "Failed to clear cache"),
        }
    }

    /// Slips embed their tag and the dashboard groups by tag.
    pub(crate) fn invalidate_after_tag_change(&self) {
        self.inner.tags.invalidate();
        self.invalidate_after_slip_change();
    }

    pub(crate) fn invalidate_after_slip_change(&self) {
        self.inner.slips.invalidate();
        self.inner.dashboard.invalidate();
    }

    /// Start the periodic sweep of expired cache entries, if enabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_cache_sweeper(&self) -> Option<JoinHandle<()>> {
        if !self.inner.cache.config().enable_sweep_task {
            return None;
        }
        Some(self.inner.cache.spawn_sweeper())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal request helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute an uncached request.
    pub(crate) async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> RequestOutcome<T> {
        self.inner.executor.execute(request).await
    }

    /// Execute an uncached request that must return a body.
    pub(crate) async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ResourceResult<T> {
        self.execute(&request).await.into_result()
    }

    /// Execute an uncached request whose body is ignored.
    pub(crate) async fn call_unit(&self, request: ApiRequest) -> ResourceResult<()> {
        self.execute::<serde_json::Value>(&request)
            .await
            .into_unit()
    }
}

/// Builder for creating a SlipshotClient.
pub struct ClientBuilder {
    base_url: Option<String>,
    api_prefix: String,
    timeout: Duration,
    user_agent: Option<String>,
    transport: Option<SharedTransport>,
    store: Option<SharedStore>,
    clock: Option<SharedClock>,
    cache_config: CacheConfig,
    resource_ttl: Option<Duration>,
    refresh_config: RefreshConfig,
    refresh_path: String,
    redirect: Option<SharedRedirect>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("timeout", &self.timeout)
            .field("cache_config", &self.cache_config)
            .field("refresh_config", &self.refresh_config)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            transport: None,
            store: None,
            clock: None,
            cache_config: CacheConfig::default(),
            resource_ttl: None,
            refresh_config: RefreshConfig::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            redirect: None,
        }
    }

    /// Create a builder from loaded configuration.
    ///
    /// Opens the file store when `cache.store = "file"`.
    pub fn from_config(config: &SlipshotConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let server = config.server();
        let session = config.session();
        let cache = config.cache();

        let mut cache_config = CacheConfig::new()
            .with_namespace(cache.namespace.clone())
            .with_default_ttl(cache.ttl());
        if let Some(secs) = cache.sweep_interval_secs {
            cache_config = cache_config
                .with_sweep_task(true)
                .with_sweep_interval(Duration::from_secs(secs.max(1)));
        }

        let mut builder = Self::new()
            .base_url(server.base_url.clone())
            .api_prefix(server.api_prefix.clone())
            .timeout(server.timeout())
            .refresh_config(
                RefreshConfig::new()
                    .with_cooldown(session.cooldown())
                    .with_max_failures(session.max_failures),
            )
            .refresh_path(session.refresh_path.clone())
            .cache_config(cache_config);

        if let Some(agent) = server.user_agent {
            builder = builder.user_agent(agent);
        }

        if cache.store == StoreBackend::File {
            let path = cache.resolved_store_path().ok_or_else(|| {
                Error::Config("no store path for the file cache backend".to_string())
            })?;
            builder = builder.store(Arc::new(FileStore::with_path(path)?));
        }

        Ok(builder)
    }

    /// Set the backend origin.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the path prefix of the REST API (default `api/`).
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the durable store (default: in memory).
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the clock used for cache timestamps.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the TTL cache configuration.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Set the lifetime of cached resources (default: the cache default TTL).
    pub fn resource_ttl(mut self, ttl: Duration) -> Self {
        self.resource_ttl = Some(ttl);
        self
    }

    /// Set the refresh coordinator configuration.
    pub fn refresh_config(mut self, config: RefreshConfig) -> Self {
        self.refresh_config = config;
        self
    }

    /// Set the renewal endpoint, relative to the API root.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Set the hook fired once when the session becomes unrecoverable.
    pub fn on_session_expired(mut self, hook: SharedRedirect) -> Self {
        self.redirect = Some(hook);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<SlipshotClient> {
        if PREFERENCES_KEY.starts_with(&self.cache_config.namespace) {
            return Err(Error::Config(format!(
                "cache namespace '{}' would cover the preferences key",
                self.cache_config.namespace
            )));
        }

        let transport: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => {
                let base_url = self
                    .base_url
                    .ok_or_else(|| Error::Config("base_url is required".to_string()))?;
                Arc::new(ReqwestTransport::new(
                    &base_url,
                    &self.api_prefix,
                    self.timeout,
                    self.user_agent,
                )?)
            }
        };

        let renewer = Arc::new(TransportRenewer::new(transport.clone(), self.refresh_path));
        let redirect = self
            .redirect
            .unwrap_or_else(|| Arc::new(LogRedirect) as SharedRedirect);
        let coordinator = Arc::new(RefreshCoordinator::new(
            renewer,
            redirect,
            self.refresh_config,
        ));
        let executor = RequestExecutor::new(transport.clone(), coordinator);

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as SharedStore);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as SharedClock);
        let cache = TtlCache::with_clock(store.clone(), clock, self.cache_config);
        let ttl = self.resource_ttl.unwrap_or(cache.config().default_ttl);

        Ok(SlipshotClient {
            inner: Arc::new(ClientInner {
                tags: ResourceCache::new(executor.clone(), cache.clone(), ttl),
                slips: ResourceCache::new(executor.clone(), cache.clone(), ttl),
                dashboard: ResourceCache::new(executor.clone(), cache.clone(), ttl),
                preferences: PreferenceStore::new(store),
                transport,
                executor,
                cache,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipshot_cache::KvStore;
    use tempfile::TempDir;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = ClientBuilder::new().base_url("not a url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_with_base_url() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000")
            .build()
            .unwrap();

        assert!(client.coordinator().is_valid());
        assert_eq!(client.cache().config().namespace, "slipshot:cache:");
        assert_eq!(client.session().attempts, 0);
    }

    #[test]
    fn test_from_config_applies_sections() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("store.json");
        let config = SlipshotConfig::from_toml(&format!(
            r#"
[session]
cooldown_ms = 500
max_failures = 5

[cache]
ttl_secs = 60
store = "file"
store_path = "{}"
sweep_interval_secs = 30
"#,
            store_path.display()
        ))
        .unwrap();

        let client = ClientBuilder::from_config(&config).unwrap().build().unwrap();

        let refresh = client.coordinator().config();
        assert_eq!(refresh.cooldown, Duration::from_millis(500));
        assert_eq!(refresh.max_failures, 5);

        let cache = client.cache().config();
        assert_eq!(cache.default_ttl, Duration::from_secs(60));
        assert!(cache.enable_sweep_task);
        assert_eq!(cache.sweep_interval, Duration::from_secs(30));

        client.cache().set_default("marker", &1).unwrap();
        assert!(store_path.exists());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = SlipshotConfig::from_toml("[server]\nbase_url = \"ftp://x\"\n").unwrap();
        assert!(matches!(
            ClientBuilder::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_namespace_may_not_cover_preferences() {
        assert_eq!(slipshot_config::PREFERENCES_KEY, PREFERENCES_KEY);

        let result = ClientBuilder::new()
            .base_url("http://localhost:8000")
            .cache_config(CacheConfig::new().with_namespace("slipshot:"))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));

        let config = SlipshotConfig::from_toml("[cache]\nnamespace = \"\"\n").unwrap();
        assert!(matches!(
            ClientBuilder::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalidate_all_keeps_preferences() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000")
            .build()
            .unwrap();

        client
            .preferences()
            .update(|p| p.theme = Some("dark".to_string()))
            .unwrap();
        client.cache().set_default("tags:", &vec![1, 2]).unwrap();

        client.invalidate_all();

        assert_eq!(client.cache().get::<Vec<i32>>("tags:"), None);
        assert_eq!(client.preferences().load().theme.as_deref(), Some("dark"));
        assert_eq!(
            client.cache().store().keys().unwrap(),
            vec![slipshot_cache::PREFERENCES_KEY.to_string()]
        );
    }
}
