//! Partitioned listing counters.
//!
//! Per-collection `{total, sticky}` counts, kept in process memory and
//! nudged in lockstep with writes. They are an optimization over
//! re-counting on every listing, not a source of truth: concurrent
//! writers can make them drift, so reads clamp at zero and
//! [`CounterCache::invalidate`] forces a recount on next access.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;

use crate::db::{DocumentStore, Filter, StoreError};

/// Live counters for one collection.
#[derive(Default)]
pub struct PartitionCounters {
    total: AtomicI64,
    sticky: AtomicI64,
}

impl PartitionCounters {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed).max(0) as u64
    }

    #[must_use]
    pub fn sticky(&self) -> u64 {
        self.sticky.load(Ordering::Relaxed).max(0) as u64
    }

    pub fn add_total(&self, delta: i64) {
        self.total.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn add_sticky(&self, delta: i64) {
        self.sticky.fetch_add(delta, Ordering::Relaxed);
    }
}

/// Lazily-initialized counter cache keyed by collection name.
#[derive(Default)]
pub struct CounterCache {
    collections: DashMap<String, Arc<PartitionCounters>>,
}

impl CounterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for a collection, recounting from the store on first
    /// access (or after an invalidation).
    ///
    /// Callers adjusting for a write must take the handle *before*
    /// issuing the write: a recount taken afterwards already includes
    /// it, and the delta would count it twice.
    pub async fn get_or_count(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
    ) -> Result<Arc<PartitionCounters>, StoreError> {
        if let Some(counters) = self.collections.get(collection) {
            return Ok(Arc::clone(&counters));
        }

        let total = store.count(collection, &Filter::all()).await?;
        let sticky = store
            .count(collection, &Filter::all().eq("sticky", json!(true)))
            .await?;

        // A concurrent recount may have landed first; keep whichever
        // entry won, the counts were taken moments apart.
        let counters = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                Arc::new(PartitionCounters {
                    total: AtomicI64::new(total as i64),
                    sticky: AtomicI64::new(sticky as i64),
                })
            });
        Ok(Arc::clone(&counters))
    }

    /// Drop a collection's counters so the next access recounts.
    pub fn invalidate(&self, collection: &str) {
        self.collections.remove(collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_read_through_counts_partitions() {
        let store = MemoryStore::new();
        for (id, sticky) in [("a", true), ("b", false), ("c", false)] {
            store
                .upsert_one(
                    "g-questions",
                    &id.repeat(24),
                    json!({ "sticky": sticky, "date": 1 }),
                )
                .await
                .unwrap();
        }

        let cache = CounterCache::new();
        let counters = cache.get_or_count(&store, "g-questions").await.unwrap();
        assert_eq!(counters.total(), 3);
        assert_eq!(counters.sticky(), 1);
    }

    #[tokio::test]
    async fn test_adjustments_and_zero_clamp() {
        let cache = CounterCache::new();
        let counters = cache
            .get_or_count(&MemoryStore::new(), "empty")
            .await
            .unwrap();

        counters.add_total(1);
        assert_eq!(counters.total(), 1);

        // Drift below zero reads as zero.
        counters.add_total(-3);
        assert_eq!(counters.total(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recount() {
        let store = MemoryStore::new();
        let cache = CounterCache::new();

        let counters = cache.get_or_count(&store, "g-questions").await.unwrap();
        assert_eq!(counters.total(), 0);

        store
            .upsert_one("g-questions", &"a".repeat(24), json!({ "date": 1 }))
            .await
            .unwrap();
        cache.invalidate("g-questions");

        let counters = cache.get_or_count(&store, "g-questions").await.unwrap();
        assert_eq!(counters.total(), 1);
    }
}
