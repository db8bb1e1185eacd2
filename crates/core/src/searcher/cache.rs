//! Short-lived cache of search outcomes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::{SearchOutcome, SearchQuery};

struct CacheEntry {
    outcome: SearchOutcome,
    generation: u64,
    stored_at: Instant,
}

/// Outcomes keyed by [`SearchQuery::cache_key`].
///
/// Entries expire after the TTL and are ignored as soon as the indexer
/// registry generation moves past the one they were stored under.
pub struct SearchCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, query: &SearchQuery, generation: u64) -> Option<SearchOutcome> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        let entry = entries.get(&query.cache_key())?;
        if entry.generation != generation || entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.outcome.clone())
    }

    /// Store an outcome. Outcomes with indexer errors are not cached so the
    /// failing indexers are asked again next time.
    pub async fn put(&self, query: &SearchQuery, generation: u64, outcome: &SearchOutcome) {
        if !self.is_enabled() || !outcome.indexer_errors.is_empty() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.generation == generation && e.stored_at.elapsed() < self.ttl);
        entries.insert(
            query.cache_key(),
            CacheEntry {
                outcome: outcome.clone(),
                generation,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
