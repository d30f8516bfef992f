//! The cache store contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::key::CacheKey;
use crate::dispatch::DownstreamResponse;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("entry of {size} bytes exceeds the {limit} byte limit")]
    EntryTooLarge { size: usize, limit: usize },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A stored response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: DownstreamResponse,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(response: DownstreamResponse, ttl: Duration) -> Self {
        Self {
            response,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.inserted_at + self.ttl
    }

    /// An entry is dead from the instant its TTL has fully elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Counters exposed through the admin API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Storage for cached downstream responses.
///
/// Implementations own their synchronization; callers never lock.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry. Never returns an entry past its TTL.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Store a response, replacing any existing entry for the key.
    async fn put(&self, key: CacheKey, response: DownstreamResponse, ttl: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Drop every entry, or only those in `region`. Returns how many went.
    async fn clear(&self, region: Option<&str>) -> Result<usize, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}
