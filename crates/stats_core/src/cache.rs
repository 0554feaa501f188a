//! Aggregation Cache
//!
//! Injected TTL cache for expensive multi-match computations (roster
//! stability, per-match roster snapshots, round tallies). No single-flight:
//! two concurrent misses on the same key both compute, the later write wins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Capability interface handed to components; swap in any backing store.
pub trait AggregationCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    fn invalidate(&self, key: &str);
}

/// `function:arg1:arg2`
pub fn cache_key(function: &str, args: &[&str]) -> String {
    let mut key = String::from(function);
    for arg in args {
        key.push(':');
        key.push_str(arg);
    }
    key
}

/// Returns the cached value or runs `producer` and stores its success.
/// Errors are returned as-is and never cached.
pub async fn get_or_compute<V, E, F, Fut>(
    cache: &dyn AggregationCache<V>,
    key: &str,
    ttl: Duration,
    producer: F,
) -> Result<V, E>
where
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(hit) = cache.get(key) {
        debug!(key, "cache hit");
        return Ok(hit);
    }
    debug!(key, "cache miss");
    let value = producer().await?;
    cache.set(key, value.clone(), ttl);
    Ok(value)
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-process store, `RwLock<HashMap>` with lazy expiry.
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, e| e.expires_at > now);
    }
}

impl<V> AggregationCache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let expired = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.invalidate(key);
        }
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn key_joins_function_and_args() {
        assert_eq!(cache_key("roster_stability", &["474"]), "roster_stability:474");
        assert_eq!(cache_key("match_roster", &["1001", "474"]), "match_roster:1001:474");
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("a", 1u32, Duration::from_millis(20));
        cache.set("b", 2u32, Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(1));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = MemoryCache::new();
        cache.set("a", "x".to_string(), Duration::from_secs(60));
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn producer_runs_once_while_fresh() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v: Result<u32, String> = get_or_compute(&cache, "k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
            assert_eq!(v, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        let first: Result<u32, String> =
            get_or_compute(&cache, "k", Duration::from_secs(60), || async { Err("boom".to_string()) }).await;
        assert!(first.is_err());
        let second: Result<u32, String> =
            get_or_compute(&cache, "k", Duration::from_secs(60), || async { Ok(3) }).await;
        assert_eq!(second, Ok(3));
    }

    #[tokio::test]
    async fn shared_across_tasks() {
        let cache = Arc::new(MemoryCache::<u32>::new());
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set(&format!("k{i}"), i, Duration::from_secs(60));
                cache.get(&format!("k{i}"))
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap(), Some(i as u32));
        }
        assert_eq!(cache.len(), 8);
    }
}
