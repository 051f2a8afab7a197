//! Time-to-live response cache keyed by post id.
//!
//! Stale entries are not purged on read; they are ignored and overwritten by
//! the next successful extraction. With `max_entries == 0` the cache grows for
//! the lifetime of the process.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use clipx_models::ExtractionResult;

struct CacheEntry {
    result: ExtractionResult,
    created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Process-local result cache.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    /// Create an unbounded cache.
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, 0)
    }

    /// Create a cache that evicts the oldest entries above `max_entries` (0 = unbounded).
    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Return the cached result if it is younger than the TTL.
    pub async fn get(&self, post_id: &str) -> Option<ExtractionResult> {
        let entries = self.entries.read().await;
        entries
            .get(post_id)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.result.clone())
    }

    /// Insert or replace the entry for `post_id`, resetting its age.
    pub async fn put(&self, post_id: impl Into<String>, result: ExtractionResult) {
        let post_id = post_id.into();
        let mut entries = self.entries.write().await;
        entries.insert(
            post_id.clone(),
            CacheEntry {
                result,
                created_at: Instant::now(),
            },
        );
        debug!(post_id = %post_id, "Cached extraction result");

        if self.max_entries > 0 && entries.len() > self.max_entries {
            self.evict(&mut entries);
        }
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict(&self, entries: &mut HashMap<String, CacheEntry>) {
        // Stale entries go first
        entries.retain(|_, entry| entry.is_fresh(self.ttl));

        if entries.len() > self.max_entries {
            let mut by_age: Vec<_> = entries.iter().map(|(id, e)| (id.clone(), e.created_at)).collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);

            let to_remove = entries.len() - self.max_entries;
            for (id, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&id);
            }
            warn!("Response cache exceeded capacity, removed {} entries", to_remove);
        }
    }
}
