//! Response cache.
//!
//! # Responsibilities
//! - Derive cache keys from the parts of a request a route marks relevant
//! - Store successful downstream responses until their TTL elapses
//! - Invalidate by key, by region, or wholesale
//!
//! # Design Decisions
//! - The pipeline only sees the `CacheStore` trait; the in-memory store is
//!   the default backend and can be swapped without touching the pipeline
//! - Time comes from `tokio::time::Instant` so expiry is testable with a
//!   paused clock

pub mod key;
pub mod memory;
pub mod store;
pub mod sweeper;

pub use key::CacheKey;
pub use memory::MemoryCacheStore;
pub use store::{CacheEntry, CacheError, CacheStats, CacheStore};
pub use sweeper::CacheSweeper;
