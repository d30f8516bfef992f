//! In-process cache store.
//!
//! # Design Decisions
//! - Entries live in a sharded `DashMap`; no caller-visible locks
//! - Expiry is checked on every read and swept in the background
//! - Capacity pressure purges expired entries first, then evicts the least
//!   recently used ones using a monotonic access counter

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::cache::key::CacheKey;
use crate::cache::store::{CacheEntry, CacheError, CacheStats, CacheStore};
use crate::dispatch::DownstreamResponse;

struct Slot {
    entry: CacheEntry,
    last_access: AtomicU64,
}

enum Lookup {
    Fresh(CacheEntry),
    Expired,
    Missing,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

pub struct MemoryCacheStore {
    entries: DashMap<CacheKey, Slot>,
    max_entries: usize,
    max_body_bytes: usize,
    access_clock: AtomicU64,
    counters: Counters,
}

impl MemoryCacheStore {
    pub fn new(max_entries: usize, max_body_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            max_body_bytes,
            access_clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.counters.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    fn enforce_capacity(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        self.purge_expired();

        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .map(|item| (item.value().last_access.load(Ordering::Relaxed), item.key().clone()))
            .collect();
        by_age.sort_by_key(|(access, _)| *access);

        for (_, key) in by_age.into_iter().take(excess) {
            if self.entries.remove(&key).is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Evicted least recently used cache entry");
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let now = Instant::now();
        let lookup = match self.entries.get(key) {
            Some(slot) if !slot.entry.is_expired(now) => {
                slot.last_access.store(self.tick(), Ordering::Relaxed);
                Lookup::Fresh(slot.entry.clone())
            }
            Some(_) => Lookup::Expired,
            None => Lookup::Missing,
        };

        match lookup {
            Lookup::Fresh(entry) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            Lookup::Expired => {
                // The read guard is gone; re-check under the write lock since a
                // fresh entry may have replaced the stale one meanwhile.
                if self.entries.remove_if(key, |_, slot| slot.entry.is_expired(now)).is_some() {
                    self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                }
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Missing => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: CacheKey, response: DownstreamResponse, ttl: Duration) -> Result<(), CacheError> {
        if response.body.len() > self.max_body_bytes {
            return Err(CacheError::EntryTooLarge {
                size: response.body.len(),
                limit: self.max_body_bytes,
            });
        }

        let slot = Slot {
            entry: CacheEntry::new(response, ttl),
            last_access: AtomicU64::new(self.tick()),
        };
        self.entries.insert(key, slot);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        self.enforce_capacity();
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self, region: Option<&str>) -> Result<usize, CacheError> {
        let before = self.entries.len();
        match region {
            Some(region) => self.entries.retain(|key, _| key.region != region),
            None => self.entries.clear(),
        }
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        })
    }
}
