//! # Plan cache (§4.14, §5 Concurrency & Resource Model)
//!
//! A hash-keyed, LRU+TTL map from `(query structure, plan-shaping options)`
//! to a realized plan. Mirrors the teacher's `execution` module's cache
//! intent and `session.rs`'s `parking_lot::RwLock<HashMap<..>>` lock
//! discipline: shared lock for reads, exclusive lock for writes, atomic
//! counters readable without holding either lock.
//!
//! `get` never mutates — an expired hit is reported as a miss rather than
//! deleted, to avoid a reader ever needing to upgrade to a write lock
//! (§5: "A `get` that finds an expired entry does not delete it").

use crate::ast::Query;
use crate::options::PlannerOptions;
use crate::realize::RealizedPlan;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cache key: the SHA-256 digest of the query's structural shape plus the
/// plan-shaping subset of [`PlannerOptions`] (§4.14). Two queries differing
/// in any shape-affecting option never alias (§8 property 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn compute(query: &Query, options: &PlannerOptions) -> Self {
        let mut hasher = Sha256::new();

        // Structural-only: `serde_json` of `find`/`where_clauses`/`inputs`/
        // `order_by` never carries runtime execution values, only the
        // query's own literal constants and symbol names, matching §4.14's
        // "never include the runtime values passed at execution time."
        if let Ok(bytes) = serde_json::to_vec(&query.find) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = serde_json::to_vec(&query.where_clauses) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = serde_json::to_vec(&query.inputs) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = serde_json::to_vec(&query.order_by) {
            hasher.update(&bytes);
        }

        for flag in options.cache_key_fields() {
            hasher.update([u8::from(flag)]);
        }

        CacheKey(hasher.finalize().into())
    }
}

struct Entry {
    plan: Arc<RealizedPlan>,
    created_at: Instant,
}

/// Sizing/expiry knobs (§4.14: "Soft bound `max_size` (default 1000); TTL
/// (default 5 minutes)").
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_size: 1000,
            ttl: Duration::from_secs(300),
        }
    }
}

/// Point-in-time snapshot of cache counters (§4.14 `stats()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// The shared, concurrency-safe plan cache. Wrap in `Arc` and hand the same
/// instance to every `PlannerOptions::cache` that should share it.
pub struct PlanCache {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    pub fn new(config: CacheConfig) -> Self {
        PlanCache {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a previously cached plan. Read-only: an expired entry is
    /// reported as a miss but left in place for a later `set` to evict.
    pub fn get(&self, query: &Query, options: &PlannerOptions) -> Option<Arc<RealizedPlan>> {
        let key = CacheKey::compute(query, options);
        let guard = self.entries.read();
        let hit = guard.get(&key).and_then(|entry| {
            if entry.created_at.elapsed() <= self.config.ttl {
                Some(entry.plan.clone())
            } else {
                None
            }
        });
        drop(guard);

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Publish a plan for `(query, options)`. Evicts expired entries first
    /// if at capacity, then the single oldest entry if still at capacity
    /// (§4.14 "Eviction").
    pub fn set(&self, query: &Query, options: &PlannerOptions, plan: Arc<RealizedPlan>) {
        let key = CacheKey::compute(query, options);
        let mut guard = self.entries.write();

        if guard.len() >= self.config.max_size && !guard.contains_key(&key) {
            let ttl = self.config.ttl;
            guard.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        }

        if guard.len() >= self.config.max_size && !guard.contains_key(&key) {
            if let Some(oldest_key) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| *k)
            {
                guard.remove(&oldest_key);
            }
        }

        guard.insert(
            key,
            Entry {
                plan,
                created_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.read().len(),
        }
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        PlanCache::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::realize::{RealizedPhase, RealizedPlan};
    use std::thread;

    fn dummy_plan(query: Query) -> Arc<RealizedPlan> {
        Arc::new(RealizedPlan {
            query,
            phases: vec![RealizedPhase::default()],
        })
    }

    #[test]
    fn set_then_get_hits() {
        let cache = PlanCache::new(CacheConfig::default());
        let q = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let opts = PlannerOptions::default();
        cache.set(&q, &opts, dummy_plan(q.clone()));
        assert!(cache.get(&q, &opts).is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn differing_options_miss() {
        let cache = PlanCache::new(CacheConfig::default());
        let q = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let mut opts_a = PlannerOptions::default();
        opts_a.subquery_decorrelation = true;
        let mut opts_b = PlannerOptions::default();
        opts_b.subquery_decorrelation = false;

        cache.set(&q, &opts_a, dummy_plan(q.clone()));
        assert!(cache.get(&q, &opts_b).is_none());
        assert!(cache.get(&q, &opts_a).is_some());
    }

    #[test]
    fn ttl_expiry_reports_miss_without_evicting() {
        let cache = PlanCache::new(CacheConfig {
            max_size: 10,
            ttl: Duration::from_millis(1),
        });
        let q = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let opts = PlannerOptions::default();
        cache.set(&q, &opts, dummy_plan(q.clone()));
        thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&q, &opts).is_none());
        // still physically present, just expired
        assert_eq!(cache.entries.read().len(), 1);
    }

    #[test]
    fn eviction_at_capacity_drops_oldest() {
        let cache = PlanCache::new(CacheConfig {
            max_size: 1,
            ttl: Duration::from_secs(300),
        });
        let q1 = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let q2 = QueryBuilder::new().find_var("?e").pattern("?e", ":b", "?v").build();
        let opts = PlannerOptions::default();
        cache.set(&q1, &opts, dummy_plan(q1.clone()));
        cache.set(&q2, &opts, dummy_plan(q2.clone()));
        assert!(cache.get(&q1, &opts).is_none());
        assert!(cache.get(&q2, &opts).is_some());
    }

    #[test]
    fn concurrent_reads_do_not_block_each_other() {
        let cache = Arc::new(PlanCache::new(CacheConfig::default()));
        let q = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let opts = PlannerOptions::default();
        cache.set(&q, &opts, dummy_plan(q.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let q = q.clone();
                let opts = opts.clone();
                thread::spawn(move || cache.get(&q, &opts).is_some())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
