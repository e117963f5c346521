//! Repair cache trait

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;
use crate::domain::repair::RepairOutcome;
use crate::domain::DomainError;

/// A cached session result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: CacheKey,
    pub result: RepairOutcome,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: CacheKey, result: RepairOutcome) -> Self {
        Self {
            key,
            result,
            created_at: Utc::now(),
        }
    }
}

/// Hit/miss counters and current size
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(size: u64, hits: u64, misses: u64) -> Self {
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        Self {
            size,
            hits,
            misses,
            hit_rate,
        }
    }
}

/// Process-wide store of repair outcomes keyed by input content hash.
///
/// Implementations must tolerate concurrent lookups and inserts.
#[async_trait]
pub trait RepairCache: Send + Sync + Debug {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, DomainError>;

    async fn set(&self, key: CacheKey, outcome: RepairOutcome) -> Result<(), DomainError>;

    async fn stats(&self) -> CacheStats;

    async fn clear(&self) -> Result<(), DomainError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::new(1, 3, 1).hit_rate, 0.75);
        assert_eq!(CacheStats::new(0, 0, 0).hit_rate, 0.0);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let value = serde_json::to_value(CacheStats::new(2, 1, 1)).unwrap();
        assert_eq!(value["hitRate"], 0.5);
        assert_eq!(value["size"], 2);
    }
}
