//! In-memory cache for fetched issuance payloads.
//!
//! Keys are structured `(grid, issuance)` values rather than formatted
//! strings so the write and evict paths cannot drift apart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{GridPoint, Issuance, RawForecastItem};

/// Cache key identifying one issuance request for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssuanceCacheKey {
    pub grid: GridPoint,
    pub issuance: Issuance,
}

impl IssuanceCacheKey {
    pub const fn new(grid: GridPoint, issuance: Issuance) -> Self {
        Self { grid, issuance }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    items: Vec<RawForecastItem>,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<IssuanceCacheKey, CacheEntry>,
    default_ttl: Duration,
}

/// Thread-safe issuance response cache.
#[derive(Debug, Clone)]
pub struct IssuanceCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    evictions: Arc<AtomicU64>,
}

impl IssuanceCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                default_ttl,
            })),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cache with a default TTL of ten minutes, roughly half the shortest
    /// gap between upstream issuances.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(600))
    }

    /// Get the cached items for a key if present and not expired.
    pub async fn get(&self, key: &IssuanceCacheKey) -> Option<Vec<RawForecastItem>> {
        let store = self.inner.read().await;
        store.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.items.clone())
            } else {
                None
            }
        })
    }

    pub async fn put(&self, key: IssuanceCacheKey, items: Vec<RawForecastItem>) {
        let mut store = self.inner.write().await;
        if store.default_ttl == Duration::ZERO {
            return;
        }
        let expires_at = Instant::now() + store.default_ttl;
        store.map.insert(key, CacheEntry { items, expires_at });
    }

    /// Remove a key. Idempotent: evicting an absent key is a no-op, so
    /// concurrent evictions of the same key are safe. Returns whether an
    /// entry was actually removed.
    pub async fn evict(&self, key: &IssuanceCacheKey) -> bool {
        let mut store = self.inner.write().await;
        let removed = store.map.remove(key).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Number of evictions that removed a live entry.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        let now = Instant::now();
        store.map.retain(|_, entry| entry.expires_at > now);
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ForecastSlotKey};
    use time::macros::{date, time};

    fn key() -> IssuanceCacheKey {
        IssuanceCacheKey::new(
            GridPoint::new(60, 127),
            Issuance::new(date!(2026 - 08 - 28), time!(23:00)),
        )
    }

    fn item() -> RawForecastItem {
        RawForecastItem::new(
            Category::Temperature,
            ForecastSlotKey::new(date!(2026 - 08 - 29), time!(09:00)),
            Issuance::new(date!(2026 - 08 - 28), time!(23:00)),
            "18",
            GridPoint::new(60, 127),
        )
    }

    #[tokio::test]
    async fn put_then_get_returns_the_items() {
        let cache = IssuanceCache::with_default_ttl();
        cache.put(key(), vec![item()]).await;

        let cached = cache.get(&key()).await.expect("entry present");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].value, "18");
    }

    #[tokio::test]
    async fn eviction_is_idempotent_and_counted_once() {
        let cache = IssuanceCache::with_default_ttl();
        cache.put(key(), vec![]).await;

        assert!(cache.evict(&key()).await);
        assert!(!cache.evict(&key()).await);
        assert_eq!(cache.evictions(), 1);
        assert!(cache.get(&key()).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let cache = IssuanceCache::new(Duration::from_millis(20));
        cache.put(key(), vec![item()]).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&key()).await.is_none());

        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_disables_writes() {
        let cache = IssuanceCache::new(Duration::ZERO);
        cache.put(key(), vec![item()]).await;
        assert!(cache.is_empty().await);
    }
}
