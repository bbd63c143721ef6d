//! Request deduplication on top of the cache store
//!
//! At most one fetch per signature is ever in flight. Concurrent callers for the
//! same signature attach to the pending fetch and all receive its outcome.
//! The fetch itself runs on its own task so it completes (and fills the cache)
//! even if every caller goes away.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use super::cache::{CacheEntry, CacheStore, DEFAULT_CACHE_TTL};
use super::error::FetchError;

type PendingFetch = Shared<BoxFuture<'static, Result<Value, FetchError>>>;
type InFlightMap = Mutex<HashMap<String, InFlight>>;

/// A registered fetch. `id` tells a finished fetch apart from a newer one
/// started for the same signature.
struct InFlight {
    id: u64,
    pending: PendingFetch,
}

/// Per-call options for [`RequestDeduplicator::get_or_fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Ignore a fresh cache entry and go to the network (still coalesced)
    pub skip_cache: bool,
}

impl FetchOptions {
    pub fn skip_cache() -> Self {
        Self { skip_cache: true }
    }
}

/// Coalesces concurrent fetches per signature and serves fresh cache hits.
pub struct RequestDeduplicator {
    cache: Arc<CacheStore>,
    in_flight: Arc<InFlightMap>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl RequestDeduplicator {
    pub fn new(ttl: Duration) -> Self {
        Self::with_cache(Arc::new(CacheStore::new()), ttl)
    }

    pub fn with_cache(cache: Arc<CacheStore>, ttl: Duration) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Last successful response for `signature`, however old.
    pub fn cached(&self, signature: &str) -> Option<CacheEntry> {
        self.cache.get(signature)
    }

    /// Number of signatures with a fetch currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Return cached data, join a pending fetch, or start one.
    ///
    /// 1. Without `skip_cache`, a cache entry younger than the TTL is returned
    ///    without calling `fetcher`.
    /// 2. If a fetch for `signature` is already in flight, its outcome is shared.
    /// 3. Otherwise `fetcher` is invoked exactly once. Success is cached with the
    ///    current time; failure leaves any previous entry untouched.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        signature: &str,
        fetcher: F,
        options: FetchOptions,
    ) -> Result<Value, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        if let Some(data) = self.fresh(signature, options) {
            return Ok(data);
        }

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(signature) {
                Some(entry) => {
                    tracing::debug!(signature = %signature, "Joining in-flight fetch");
                    metrics::counter!(crate::metrics::FETCH_COALESCED_TOTAL).increment(1);
                    entry.pending.clone()
                }
                None => {
                    // A fetch may have completed since the first check. It
                    // caches before deregistering, so the entry is visible here.
                    if let Some(data) = self.fresh(signature, options) {
                        return Ok(data);
                    }
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let pending = self.start(signature.to_string(), id, fetcher());
                    in_flight.insert(
                        signature.to_string(),
                        InFlight {
                            id,
                            pending: pending.clone(),
                        },
                    );
                    pending
                }
            }
        };

        pending.await
    }

    fn fresh(&self, signature: &str, options: FetchOptions) -> Option<Value> {
        if options.skip_cache {
            return None;
        }
        let data = self.cache.get_fresh(signature, self.ttl)?;
        tracing::debug!(signature = %signature, "Cache hit");
        metrics::counter!(crate::metrics::CACHE_HITS_TOTAL).increment(1);
        Some(data)
    }

    /// Spawn the fetch and wrap its join handle as a shareable future.
    ///
    /// Called with the in-flight lock held. The task deregisters through a
    /// guard that takes the same lock, so it cannot finish before it is
    /// registered and it deregisters even if the fetch panics.
    fn start<Fut>(&self, signature: String, id: u64, fetch: Fut) -> PendingFetch
    where
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let deregister = Deregister {
            in_flight: Arc::clone(&self.in_flight),
            signature: signature.clone(),
            id,
        };

        let handle = tokio::spawn(async move {
            let _deregister = deregister;
            tracing::debug!(signature = %signature, "Fetching");
            let result = fetch.await;
            match &result {
                Ok(data) => {
                    cache.insert(signature.clone(), data.clone());
                    metrics::counter!(crate::metrics::FETCHES_TOTAL, "outcome" => "success")
                        .increment(1);
                }
                Err(e) => {
                    tracing::warn!(signature = %signature, error = %e, "Fetch failed");
                    metrics::counter!(crate::metrics::FETCHES_TOTAL, "outcome" => e.outcome())
                        .increment(1);
                }
            }
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let error = FetchError::Aborted(e.to_string());
                    tracing::warn!(error = %error, "Fetch task did not complete");
                    metrics::counter!(crate::metrics::FETCHES_TOTAL, "outcome" => error.outcome())
                        .increment(1);
                    Err(error)
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Default for RequestDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

/// Removes a fetch from the in-flight map when its task ends, however it ends.
struct Deregister {
    in_flight: Arc<InFlightMap>,
    signature: String,
    id: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight
            .get(&self.signature)
            .is_some_and(|entry| entry.id == self.id)
        {
            in_flight.remove(&self.signature);
        }
    }
}

fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}
