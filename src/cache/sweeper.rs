//! Background expiry sweep for the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cache::memory::MemoryCacheStore;

pub struct CacheSweeper {
    store: Arc<MemoryCacheStore>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(store: Arc<MemoryCacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Cache sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.store.len(), "Swept expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
