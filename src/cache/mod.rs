//! Resolution result cache.
//!
//! # Responsibilities
//! - Memoize (route, parameters) per normalized URL and namespace
//! - Strict LRU capacity bound
//! - TTL expiry measured from insertion, checked on lookup
//! - Hit/miss statistics that survive clears
//!
//! # Design Decisions
//! - One mutex around the store; counters are atomics
//! - Every `get` counts exactly one hit or one miss
//! - Entries are evicted silently: a resolution is cheap to rebuild
//! - TTL and LRU are independent; an expired hit never refreshes recency

pub mod lru;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::routing::params::Parameters;
use crate::routing::router::RouteEntry;
use lru::LruStore;

/// Cache key: namespace plus normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: Option<String>,
    pub url: String,
}

impl CacheKey {
    /// Key for a normalized URL resolved in `namespace`.
    pub fn new(namespace: Option<&str>, normalized_url: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            url: normalized_url.into(),
        }
    }
}

/// A cached resolution.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub route: Arc<RouteEntry>,
    pub parameters: Parameters,
    pub created_at: Instant,
    pub last_access: Instant,
}

impl CacheEntry {
    /// Entry created and last accessed now.
    pub fn new(route: Arc<RouteEntry>, parameters: Parameters) -> Self {
        let now = Instant::now();
        Self {
            route,
            parameters,
            created_at: now,
            last_access: now,
        }
    }

    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.created_at) >= ttl)
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStatistics {
    /// Fraction of lookups that hit, in `[0, 1]`. Zero before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memory pressure signalled by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    /// Drop expired entries and the older half of the rest.
    Moderate,
    /// Drop everything.
    Critical,
}

#[derive(Debug)]
struct Inner {
    store: LruStore<CacheKey, CacheEntry>,
    ttl: Option<Duration>,
}

/// Thread-safe LRU + TTL cache of route resolutions.
#[derive(Debug)]
pub struct RouteCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl RouteCache {
    /// `ttl` of `None` disables expiry.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store: LruStore::new(capacity),
                ttl,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Build from config. A disabled cache gets capacity 0.
    pub fn from_config(config: &CacheConfig) -> Self {
        let capacity = if config.enabled { config.capacity } else { 0 };
        Self::new(capacity, config.ttl())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a resolution, refreshing its recency on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut inner = self.lock();
        let ttl = inner.ttl;

        let Some(expired) = inner.store.peek(key).map(|entry| entry.is_expired(ttl, now)) else {
            drop(inner);
            self.record_miss();
            return None;
        };

        if expired {
            inner.store.remove(key);
            let size = inner.store.len();
            drop(inner);
            tracing::trace!(url = %key.url, "Cache entry expired");
            metrics::record_cache_size(size);
            self.record_miss();
            return None;
        }

        let entry = inner.store.get(key).map(|entry| {
            entry.last_access = now;
            entry.clone()
        });
        drop(inner);
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(true);
        entry
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(false);
    }

    /// Store a resolution, evicting the least recently used entry if full.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        let mut inner = self.lock();
        let evicted = inner.store.insert(key, entry);
        let size = inner.store.len();
        drop(inner);

        if !evicted.is_empty() {
            self.evictions.fetch_add(evicted.len() as u64, Ordering::Relaxed);
            for (key, _) in &evicted {
                tracing::trace!(url = %key.url, "Cache entry evicted");
            }
        }
        metrics::record_cache_size(size);
    }

    /// Remove one key.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let removed = self.lock().store.remove(key).is_some();
        if removed {
            metrics::record_cache_size(self.len());
        }
        removed
    }

    /// Remove entries matching `predicate`. Returns how many were removed.
    pub fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CacheKey, &CacheEntry) -> bool,
    {
        let mut inner = self.lock();
        let removed = inner.store.retain(|k, v| !predicate(k, v));
        let size = inner.store.len();
        drop(inner);
        if removed > 0 {
            tracing::debug!(removed, "Cache entries invalidated");
            metrics::record_cache_size(size);
        }
        removed
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        self.lock().store.clear();
        metrics::record_cache_size(0);
    }

    /// Drop entries older than the TTL.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let ttl = inner.ttl;
        let removed = inner.store.retain(|_, entry| !entry.is_expired(ttl, now));
        let size = inner.store.len();
        drop(inner);
        metrics::record_cache_size(size);
        removed
    }

    /// React to a platform memory warning.
    pub fn handle_memory_pressure(&self, level: MemoryPressure) -> usize {
        let before = self.len();
        match level {
            MemoryPressure::Critical => self.clear(),
            MemoryPressure::Moderate => {
                self.purge_expired();
                let mut inner = self.lock();
                let target = inner.store.len() / 2;
                while inner.store.len() > target {
                    if inner.store.pop_lru().is_none() {
                        break;
                    }
                }
                let size = inner.store.len();
                drop(inner);
                metrics::record_cache_size(size);
            }
        }
        let dropped = before.saturating_sub(self.len());
        tracing::info!(?level, dropped, "Route cache trimmed under memory pressure");
        dropped
    }

    /// Change capacity, evicting least recently used entries down to it.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        let evicted = inner.store.set_capacity(capacity);
        let size = inner.store.len();
        drop(inner);
        self.evictions.fetch_add(evicted.len() as u64, Ordering::Relaxed);
        metrics::record_cache_size(size);
    }

    /// `None` disables expiry. Applies to existing entries too.
    pub fn set_ttl(&self, ttl: Option<Duration>) {
        self.lock().ttl = ttl;
    }

    /// Current TTL, `None` when entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.lock().ttl
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of counters, size and capacity.
    pub fn statistics(&self) -> CacheStatistics {
        let inner = self.lock();
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: inner.store.len(),
            capacity: inner.store.capacity(),
        }
    }

    /// Zero the hit/miss/eviction counters. Entries are kept.
    pub fn reset_statistics(&self) {
        let _inner = self.lock();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::target::FnTarget;
    use crate::routing::router::{RouteDefinition, RouteRegistry};

    fn entry(registry: &RouteRegistry, pattern: &str) -> CacheEntry {
        let route = registry
            .register(RouteDefinition::new(pattern, Arc::new(FnTarget::named(pattern))))
            .unwrap();
        CacheEntry::new(route, Parameters::new())
    }

    fn key(url: &str) -> CacheKey {
        CacheKey::new(None, url)
    }

    #[test]
    fn test_capacity_two_evicts_first() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(2, None);
        cache.insert(key("/a"), entry(&registry, "/a"));
        cache.insert(key("/b"), entry(&registry, "/b"));
        cache.insert(key("/c"), entry(&registry, "/c"));

        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.get(&key("/b")).is_some());
        assert!(cache.get(&key("/c")).is_some());

        let stats = cache.statistics();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[test]
    fn test_get_counts_exactly_once() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(4, None);
        cache.insert(key("/a"), entry(&registry, "/a"));

        for i in 0..10u64 {
            let url = if i % 2 == 0 { "/a" } else { "/missing" };
            cache.get(&key(url));
            let stats = cache.statistics();
            assert_eq!(stats.hits + stats.misses, i + 1);
            assert!((0.0..=1.0).contains(&stats.hit_rate()));
        }
        assert_eq!(cache.statistics().hit_rate(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_measured_from_creation() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(4, Some(Duration::from_secs(10)));
        cache.insert(key("/a"), entry(&registry, "/a"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&key("/a")).is_some());

        // access at 6s does not extend life past 10s
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&key("/a")).is_none());
        assert_eq!(cache.len(), 0);

        let stats = cache.statistics();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lookup_keeps_other_recency() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(2, Some(Duration::from_secs(5)));
        cache.insert(key("/old"), entry(&registry, "/old"));
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.insert(key("/young"), entry(&registry, "/young"));
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(cache.get(&key("/old")).is_none());
        assert!(cache.get(&key("/young")).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_keeps_statistics() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(4, None);
        cache.insert(key("/a"), entry(&registry, "/a"));
        cache.get(&key("/a"));
        cache.get(&key("/b"));

        cache.clear();
        let stats = cache.statistics();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 0));

        cache.reset_statistics();
        let stats = cache.statistics();
        assert_eq!((stats.hits, stats.misses), (0, 0));
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_memory_pressure() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(8, None);
        for i in 0..6 {
            let url = format!("/p{i}");
            cache.insert(key(&url), entry(&registry, &url));
        }

        assert_eq!(cache.handle_memory_pressure(MemoryPressure::Moderate), 3);
        assert!(cache.get(&key("/p0")).is_none());
        assert!(cache.get(&key("/p5")).is_some());

        cache.handle_memory_pressure(MemoryPressure::Critical);
        assert!(cache.is_empty());
        assert_eq!(cache.statistics().hits, 1);
    }

    #[test]
    fn test_invalidate_by_module() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(4, None);
        let owned = registry
            .register(
                RouteDefinition::new("/m", Arc::new(FnTarget::named("m"))).owned_by("M"),
            )
            .unwrap();
        cache.insert(key("/m"), CacheEntry::new(owned, Parameters::new()));
        cache.insert(key("/free"), entry(&registry, "/free"));

        let removed = cache.invalidate_where(|_, e| e.route.module.as_deref() == Some("M"));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_shrinking_capacity_evicts() {
        let registry = RouteRegistry::new();
        let cache = RouteCache::new(3, None);
        for url in ["/a", "/b", "/c"] {
            cache.insert(key(url), entry(&registry, url));
        }
        cache.set_capacity(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("/c")).is_some());
    }
}
