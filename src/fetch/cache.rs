//! TTL cache of fetched resources, keyed by request signature.

use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// A cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Signature → last successful response. At most one entry per signature.
///
/// Only the [`RequestDeduplicator`](super::RequestDeduplicator) writes to it.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data for `signature` if it is younger than `ttl`.
    pub fn get_fresh(&self, signature: &str, ttl: Duration) -> Option<Value> {
        self.entries
            .get(signature)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.data.clone())
    }

    /// The entry for `signature` regardless of age.
    pub fn get(&self, signature: &str) -> Option<CacheEntry> {
        self.entries.get(signature).map(|entry| entry.clone())
    }

    pub(crate) fn insert(&self, signature: String, data: Value) {
        self.entries.insert(
            signature,
            CacheEntry {
                data,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_within_ttl() {
        let cache = CacheStore::new();
        cache.insert("/api/pops".to_string(), json!([1, 2]));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            cache.get_fresh("/api/pops", DEFAULT_CACHE_TTL),
            Some(json!([1, 2]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_after_ttl_but_still_readable() {
        let cache = CacheStore::new();
        cache.insert("/api/pops".to_string(), json!({"n": 1}));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get_fresh("/api/pops", DEFAULT_CACHE_TTL).is_none());

        let entry = cache.get("/api/pops").unwrap();
        assert_eq!(entry.data, json!({"n": 1}));
        assert_eq!(entry.age(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_replaces_entry() {
        let cache = CacheStore::new();
        cache.insert("k".to_string(), json!(1));
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.insert("k".to_string(), json!(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_fresh("k", DEFAULT_CACHE_TTL), Some(json!(2)));
    }

    #[test]
    fn test_missing_signature() {
        let cache = CacheStore::new();
        assert!(cache.is_empty());
        assert!(cache.get("nope").is_none());
        assert!(cache.get_fresh("nope", DEFAULT_CACHE_TTL).is_none());
    }
}
