//! In-memory repair cache using moka

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;

use crate::config::CacheConfig;
use crate::domain::cache::{CacheEntry, CacheKey, CacheStats, RepairCache};
use crate::domain::repair::RepairOutcome;
use crate::domain::DomainError;

/// Thread-safe bounded cache of session outcomes
///
/// moka handles LRU eviction and TTL expiry; entries are also
/// checked against their own `created_at` on read so an entry never
/// outlives the TTL between moka maintenance runs.
#[derive(Debug)]
pub struct InMemoryRepairCache {
    cache: MokaCache<CacheKey, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryRepairCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_capacity, config.ttl())
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let age = Utc::now().signed_duration_since(entry.created_at);
        age.to_std().map(|age| age >= self.ttl).unwrap_or(false)
    }

    fn miss(&self) -> Option<CacheEntry> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }
}

impl Default for InMemoryRepairCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[async_trait]
impl RepairCache for InMemoryRepairCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, DomainError> {
        let entry = match self.cache.get(key).await {
            Some(entry) if self.is_expired(&entry) => {
                self.cache.invalidate(key).await;
                self.miss()
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => self.miss(),
        };

        Ok(entry)
    }

    async fn set(&self, key: CacheKey, outcome: RepairOutcome) -> Result<(), DomainError> {
        let entry = CacheEntry::new(key.clone(), outcome);
        self.cache.insert(key, entry).await;
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats::new(
            self.cache.entry_count(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::WorkflowDocument;
    use serde_json::json;

    fn outcome() -> RepairOutcome {
        let document = WorkflowDocument::from_value(json!({"name": "A", "nodes": []})).unwrap();
        RepairOutcome {
            success: true,
            workflow: document,
            attempts: 1,
            history: Vec::new(),
            validated: true,
            last_error: None,
            suggestions: Vec::new(),
            from_cache: false,
            validation: None,
        }
    }

    fn key(name: &str) -> CacheKey {
        let document = WorkflowDocument::from_value(json!({"name": name})).unwrap();
        CacheKey::for_document(&document)
    }

    #[tokio::test]
    async fn test_set_get_and_stats() {
        let cache = InMemoryRepairCache::default();

        assert!(cache.get(&key("a")).await.unwrap().is_none());
        cache.set(key("a"), outcome()).await.unwrap();

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.key, key("a"));
        assert!(entry.result.success);

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = InMemoryRepairCache::new(10, Duration::from_millis(20));
        cache.set(key("a"), outcome()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get(&key("a")).await.unwrap().is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = InMemoryRepairCache::default();
        cache.set(key("a"), outcome()).await.unwrap();
        cache.set(key("b"), outcome()).await.unwrap();

        cache.clear().await.unwrap();

        assert_eq!(cache.stats().await.size, 0);
        assert!(cache.get(&key("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = InMemoryRepairCache::new(2, Duration::from_secs(60));
        for name in ["a", "b", "c", "d", "e"] {
            cache.set(key(name), outcome()).await.unwrap();
        }

        assert!(cache.stats().await.size <= 2);
    }

    #[tokio::test]
    async fn test_least_recently_used_entry_is_evicted() {
        let cache = InMemoryRepairCache::new(2, Duration::from_secs(60));
        cache.set(key("a"), outcome()).await.unwrap();
        cache.set(key("b"), outcome()).await.unwrap();

        for _ in 0..5 {
            assert!(cache.get(&key("b")).await.unwrap().is_some());
        }
        assert!(cache.get(&key("a")).await.unwrap().is_some());

        // b is now the least recently used
        cache.cache.run_pending_tasks().await;
        cache.set(key("c"), outcome()).await.unwrap();
        cache.cache.run_pending_tasks().await;

        assert!(cache.get(&key("c")).await.unwrap().is_some());
        assert!(cache.get(&key("a")).await.unwrap().is_some());
        assert!(cache.get(&key("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_access_keeps_size_bound() {
        const CAPACITY: u64 = 4;
        const TASKS: usize = 32;
        let cache = Arc::new(InMemoryRepairCache::new(CAPACITY, Duration::from_secs(60)));

        let handles: Vec<_> = (0..TASKS)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let own = key(&format!("w{}", i % 8));
                    cache.set(own.clone(), outcome()).await.unwrap();
                    cache.get(&own).await.unwrap();
                    cache.get(&key("missing")).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = cache.stats().await;
        assert!(stats.size <= CAPACITY, "size {}", stats.size);
        assert_eq!(stats.hits + stats.misses, (TASKS * 2) as u64);
        assert!(stats.misses >= TASKS as u64);
    }
}
