//! Per-provider TTL caches
//!
//! Each provider owns its caches. A cache built with a zero TTL is disabled:
//! reads always miss and writes are dropped, so every lookup goes live.

use std::{fmt, time::Duration};

use moka::future::Cache as MokaCache;

/// Upper bound on entries held by a single provider cache
const MAX_ENTRIES: u64 = 10_000;

/// Optional key-value cache whose entries expire after the configured TTL
#[derive(Clone)]
pub struct ProviderCache<V: Clone + Send + Sync + 'static> {
    inner: Option<MokaCache<String, V>>,
    ttl: Duration,
}

impl<V: Clone + Send + Sync + 'static> ProviderCache<V> {
    /// Create a cache whose entries live for `ttl`; zero disables caching
    pub fn new(ttl: Duration) -> Self {
        let inner = if ttl.is_zero() {
            None
        } else {
            Some(MokaCache::builder().max_capacity(MAX_ENTRIES).time_to_live(ttl).build())
        };
        Self { inner, ttl }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    /// Store a value for the cache-wide TTL
    pub async fn insert(&self, key: String, value: V) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }
}

impl<V: Clone + Send + Sync + 'static> fmt::Debug for ProviderCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCache")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache: ProviderCache<String> = ProviderCache::new(Duration::from_secs(60));
        assert!(cache.is_enabled());
        assert!(cache.get("billing").await.is_none());

        cache.insert("billing".to_string(), "http://10.0.0.1:8080".to_string()).await;
        assert_eq!(cache.get("billing").await.as_deref(), Some("http://10.0.0.1:8080"));
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache: ProviderCache<String> = ProviderCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());

        cache.insert("billing".to_string(), "http://10.0.0.1:8080".to_string()).await;
        assert!(cache.get("billing").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache: ProviderCache<Vec<String>> = ProviderCache::new(Duration::from_millis(50));
        cache.insert("billing".to_string(), vec!["a".to_string()]).await;
        assert!(cache.get("billing").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("billing").await.is_none());
    }

    #[test]
    fn test_debug_hides_entries() {
        let cache: ProviderCache<String> = ProviderCache::disabled();
        let rendered = format!("{:?}", cache);
        assert!(rendered.contains("enabled: false"));
    }
}
