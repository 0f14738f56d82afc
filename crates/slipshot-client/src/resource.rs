//! Resource cache orchestrator.
//!
//! A [`ResourceCache`] keeps one slot per parameter key of a [`Resource`].
//! Reads are served from memory, then from the durable TTL cache, and only
//! then from the network. At most one fetch per slot is outstanding; callers
//! arriving while it runs share its result.
//!
//! Fetches run as spawned tasks, so a caller that stops waiting does not
//! cancel the fetch for anyone else. [`ResourceCache::invalidate`] starts a
//! new generation: fetches begun before it still answer their own callers
//! but never write their result into the cache. A read after invalidation
//! waits for the superseded fetch of its slot to settle before issuing its
//! own, so one slot never has two requests on the wire.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use slipshot_cache::{CacheEntry, TtlCache};

use crate::error::ResourceError;
use crate::executor::RequestExecutor;
use crate::transport::ApiRequest;

/// A cacheable API resource.
pub trait Resource: Send + Sync + 'static {
    /// Parameters selecting one variant of the resource.
    type Params: Clone + Send + Sync + 'static;

    /// Cached value.
    type Value: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Name used as the durable key prefix (`"{NAME}:{params_key}"`).
    const NAME: &'static str;

    /// Stable key for `params`. Unparameterized resources return `""`.
    fn params_key(params: &Self::Params) -> String;

    /// API call that loads the resource.
    fn request(params: &Self::Params) -> ApiRequest;
}

/// Observable state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing loaded.
    Empty,
    /// A fetch is outstanding.
    Loading,
    /// A fresh value is held in memory.
    Loaded,
    /// The in-memory value is past its lifetime; the next read refetches.
    Stale,
}

type FetchResult<V> = Result<V, ResourceError>;
type Flight<V> = Shared<BoxFuture<'static, FetchResult<V>>>;

struct Slot<V> {
    value: Option<CacheEntry<V>>,
    in_flight: Option<Flight<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            in_flight: None,
        }
    }
}

struct Slots<V> {
    /// Bumped by every invalidation.
    generation: u64,
    by_key: HashMap<String, Slot<V>>,
    /// Fetches cut loose by an invalidation, with the generation they started in.
    superseded: HashMap<String, (u64, Flight<V>)>,
}

enum Pending<V> {
    /// Await this fetch and return its result.
    Join(Flight<V>),
    /// Wait for an invalidated fetch, then look again.
    Settle(Flight<V>),
}

struct Inner<R: Resource> {
    executor: RequestExecutor,
    cache: TtlCache,
    ttl: Duration,
    slots: Mutex<Slots<R::Value>>,
}

/// Single-flight, TTL-backed cache for one resource type.
///
/// Cheap to clone; clones share slots.
pub struct ResourceCache<R: Resource> {
    inner: Arc<Inner<R>>,
}

impl<R: Resource> Clone for ResourceCache<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.lock();
        f.debug_struct("ResourceCache")
            .field("resource", &R::NAME)
            .field("ttl", &self.inner.ttl)
            .field("generation", &slots.generation)
            .field("slots", &slots.by_key.len())
            .finish()
    }
}

/// Durable cache key for one slot.
pub fn durable_key(name: &str, params_key: &str) -> String {
    format!("{}:{}", name, params_key)
}

impl<R: Resource> ResourceCache<R> {
    pub fn new(executor: RequestExecutor, cache: TtlCache, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                cache,
                ttl,
                slots: Mutex::new(Slots {
                    generation: 0,
                    by_key: HashMap::new(),
                    superseded: HashMap::new(),
                }),
            }),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &'static str {
        R::NAME
    }

    /// Lifetime of cached values.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Read through the cache.
    pub async fn get(&self, params: &R::Params) -> FetchResult<R::Value> {
        self.fetch(params, false).await
    }

    /// Bypass cached values and load from the network.
    ///
    /// Joins a fetch already in flight for the same slot.
    pub async fn refresh(&self, params: &R::Params) -> FetchResult<R::Value> {
        self.fetch(params, true).await
    }

    /// Load the resource, from cache unless `force` is set.
    pub async fn fetch(&self, params: &R::Params, force: bool) -> FetchResult<R::Value> {
        let key = R::params_key(params);

        loop {
            let pending = {
                let mut guard = self.inner.slots.lock();
                let slots = &mut *guard;

                if let Some(flight) = slots.by_key.get(&key).and_then(|s| s.in_flight.clone()) {
                    trace!(resource = R::NAME, key = %key, "Joining fetch in flight");
                    Pending::Join(flight)
                } else if let Some((_, flight)) = slots.superseded.get(&key) {
                    trace!(resource = R::NAME, key = %key, "Waiting for invalidated fetch");
                    Pending::Settle(flight.clone())
                } else {
                    if !force && let Some(value) = self.inner.cached(&mut slots.by_key, &key) {
                        return Ok(value);
                    }
                    let flight = self.start(params.clone(), key.clone(), slots.generation);
                    slots.by_key.entry(key.clone()).or_default().in_flight = Some(flight.clone());
                    Pending::Join(flight)
                }
            };

            match pending {
                Pending::Join(flight) => return flight.await,
                Pending::Settle(flight) => {
                    let _ = flight.await;
                }
            }
        }
    }

    /// Cached value without any network call.
    pub fn peek(&self, params: &R::Params) -> Option<R::Value> {
        let key = R::params_key(params);
        let mut slots = self.inner.slots.lock();
        self.inner.cached(&mut slots.by_key, &key)
    }

    /// Current state of the slot for `params`.
    pub fn state(&self, params: &R::Params) -> SlotState {
        let key = R::params_key(params);
        let slots = self.inner.slots.lock();
        let Some(slot) = slots.by_key.get(&key) else {
            return SlotState::Empty;
        };

        if slot.in_flight.is_some() {
            return SlotState::Loading;
        }
        match &slot.value {
            Some(entry) if entry.is_expired(self.inner.cache.now_ms()) => SlotState::Stale,
            Some(_) => SlotState::Loaded,
            None => SlotState::Empty,
        }
    }

    /// Drop every cached variant of this resource, in memory and durable.
    ///
    /// Call right after any mutation of the resource. The next read of any
    /// variant goes to the network.
    pub fn invalidate(&self) {
        {
            let mut guard = self.inner.slots.lock();
            let slots = &mut *guard;
            let generation = slots.generation;
            slots.generation += 1;
            for (key, slot) in slots.by_key.drain() {
                if let Some(flight) = slot.in_flight {
                    slots.superseded.insert(key, (generation, flight));
                }
            }
        }

        match self.inner.cache.clear_prefix(&durable_key(R::NAME, "")) {
            Ok(removed) => debug!(resource = R::NAME, removed, "Resource invalidated"),
            Err(e) => warn!(resource = R::NAME, error = %e, "Failed to clear durable entries"),
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.inner.slots.lock().by_key.len()
    }

    fn start(&self, params: R::Params, key: String, generation: u64) -> Flight<R::Value> {
        debug!(resource = R::NAME, key = %key, "Fetching");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = inner
                .executor
                .execute::<R::Value>(&R::request(&params))
                .await;
            let result = outcome.into_result();
            inner.complete(&key, generation, &result);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(ResourceError::Connectivity(format!("fetch task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }
}

impl<R: Resource> Inner<R> {
    /// Fresh value from memory, then from the durable cache.
    ///
    /// Only a durable hit creates a slot; an expired memory value with no
    /// fetch behind it drops its slot.
    fn cached(&self, by_key: &mut HashMap<String, Slot<R::Value>>, key: &str) -> Option<R::Value> {
        let now = self.cache.now_ms();

        if let Some(slot) = by_key.get_mut(key)
            && let Some(entry) = &slot.value
        {
            if !entry.is_expired(now) {
                trace!(resource = R::NAME, key = %key, "Memory hit");
                return Some(entry.data.clone());
            }
            slot.value = None;
            if slot.in_flight.is_none() {
                by_key.remove(key);
            }
        }

        let entry = self
            .cache
            .get_entry::<R::Value>(&durable_key(R::NAME, key))?;
        trace!(resource = R::NAME, key = %key, "Durable hit");
        let data = entry.data.clone();
        by_key.entry(key.to_string()).or_default().value = Some(entry);
        Some(data)
    }

    /// Record a finished fetch, unless an invalidation superseded it.
    fn complete(&self, key: &str, generation: u64, result: &FetchResult<R::Value>) {
        let mut guard = self.slots.lock();
        let slots = &mut *guard;
        if slots.generation != generation {
            if slots
                .superseded
                .get(key)
                .is_some_and(|(started, _)| *started == generation)
            {
                slots.superseded.remove(key);
            }
            debug!(resource = R::NAME, key = %key, "Discarding result of invalidated fetch");
            return;
        }

        match result {
            Ok(value) => {
                let slot = slots.by_key.entry(key.to_string()).or_default();
                slot.in_flight = None;
                slot.value = Some(CacheEntry::new(value.clone(), self.cache.now_ms(), self.ttl));
                if let Err(e) = self
                    .cache
                    .set(&durable_key(R::NAME, key), value, self.ttl)
                {
                    warn!(resource = R::NAME, key = %key, error = %e, "Failed to persist resource");
                }
            }
            Err(e) => {
                debug!(resource = R::NAME, key = %key, error = %e, "Fetch failed");
                let empty = match slots.by_key.get_mut(key) {
                    Some(slot) => {
                        slot.in_flight = None;
                        slot.value.is_none()
                    }
                    None => false,
                };
                if empty {
                    slots.by_key.remove(key);
                }
            }
        }
    }
}

/// Type-erased invalidation handle.
pub trait Invalidate: Send + Sync {
    fn resource_name(&self) -> &'static str;
    fn invalidate(&self);
}

impl<R: Resource> Invalidate for ResourceCache<R> {
    fn resource_name(&self) -> &'static str {
        R::NAME
    }

    fn invalidate(&self) {
        ResourceCache::invalidate(self)
    }
}
