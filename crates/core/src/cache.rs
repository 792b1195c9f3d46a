//! In-memory memoizing cache.
//!
//! `MemoCache` is a capacity-bounded LRU map whose entries also carry their
//! own expiry deadline. Expiry is enforced lazily on every read, so an expired
//! value is never handed out even if the background sweeper never runs.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::metrics;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe LRU cache with per-entry time-to-live.
///
/// All operations take an internal lock for a short, non-blocking critical
/// section; callers never need external synchronization.
pub struct MemoCache<K, V> {
    namespace: &'static str,
    ttl: Duration,
    entries: Mutex<LruCache<K, Entry<V>>>,
}

impl<K, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries, each living `ttl`.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(namespace: &'static str, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            namespace,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Namespace label used in logs and metrics.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Time-to-live applied to every `set`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, Entry<V>>> {
        // No critical section can panic midway through an LRU update.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a live value, marking it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                metrics::record_cache_lookup(self.namespace, true);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            trace!(namespace = self.namespace, "Evicted expired cache entry on read");
        }
        metrics::record_cache_lookup(self.namespace, false);
        None
    }

    /// Insert or replace a value, refreshing both recency and expiry.
    ///
    /// At most one least-recently-used entry is evicted.
    pub fn set(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.lock();
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                trace!(namespace = self.namespace, "Evicted least recently used entry");
            }
        }
    }

    /// Remove a key. Returns whether a live or expired entry was present.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry without touching recency of live ones.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Start a background task purging expired entries every `interval`.
    ///
    /// The task holds only a weak reference and stops once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let namespace = self.namespace;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!(namespace, "Cache dropped, stopping sweeper");
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(namespace, removed, "Swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn cache(capacity: usize, ttl_ms: u64) -> MemoCache<String, u32> {
        MemoCache::new("test", capacity, Duration::from_millis(ttl_ms))
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let cache = cache(4, 60_000);
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn test_set_replaces_value() {
        let cache = cache(4, 60_000);
        cache.set("a".to_string(), 1);
        cache.set("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_returned() {
        let cache = cache(4, 30);
        cache.set("a".to_string(), 1);
        sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get(&"a".to_string()), None);
        // Lazily evicted on the read above
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_set_refreshes_expiry() {
        let cache = cache(4, 300);
        cache.set("a".to_string(), 1);
        sleep(Duration::from_millis(200)).await;
        cache.set("a".to_string(), 2);
        sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_eviction_removes_least_recently_used() {
        let cache = cache(3, 60_000);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.set("c".to_string(), 3);
        cache.set("d".to_string(), 4);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), Some(2));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
        assert_eq!(cache.get(&"d".to_string()), Some(4));
    }

    #[test]
    fn test_get_protects_from_eviction() {
        let cache = cache(3, 60_000);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.set("c".to_string(), 3);

        // Touch "a" so "b" becomes the least recently used
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        cache.set("d".to_string(), 4);

        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = cache(4, 60_000);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);

        assert!(cache.delete(&"a".to_string()));
        assert!(!cache.delete(&"a".to_string()));
        assert_eq!(cache.get(&"a".to_string()), None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let cache = cache(0, 60_000);
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"b".to_string()), Some(2));
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_entries() {
        let short = cache(4, 20);
        short.set("old".to_string(), 1);
        sleep(Duration::from_millis(40)).await;

        assert_eq!(short.purge_expired(), 1);
        assert!(short.is_empty());

        let long = cache(4, 60_000);
        long.set("fresh".to_string(), 2);
        assert_eq!(long.purge_expired(), 0);
        assert_eq!(long.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(cache(4, 20));
        cache.set("a".to_string(), 1);
        let handle = cache.spawn_sweeper(Duration::from_millis(10));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.len(), 0);

        drop(cache);
        // Sweeper exits on its next tick once the cache is gone
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(MemoCache::<String, usize>::new(
            "test",
            64,
            Duration::from_secs(60),
        ));

        let mut handles = Vec::new();
        for worker in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..200 {
                    let key = format!("k{}", (worker * 7 + i) % 100);
                    cache.set(key.clone(), i);
                    let _ = cache.get(&key);
                    if i % 10 == 0 {
                        cache.delete(&key);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(cache.len() <= 64);
    }
}
