//! §8 S6 — two option-sets that differ in a shape-affecting flag never alias
//! in the plan cache.

use dlplanner::cache::{CacheConfig, PlanCache};
use dlplanner::{plan, PlannerOptions, QueryBuilder};
use std::sync::Arc;

#[test]
fn differing_decorrelation_flag_misses_then_hits() {
    let query = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
    let cache = Arc::new(PlanCache::new(CacheConfig::default()));

    let mut with_decorrelation = PlannerOptions::default();
    with_decorrelation.cache = Some(cache.clone());
    with_decorrelation.subquery_decorrelation = true;

    let mut without_decorrelation = PlannerOptions::default();
    without_decorrelation.cache = Some(cache.clone());
    without_decorrelation.subquery_decorrelation = false;

    plan(&query, &with_decorrelation).expect("plan succeeds");
    let stats_after_first = cache.stats();
    assert_eq!(stats_after_first.misses, 1);

    // Different option-set shape: must miss, not alias onto the first entry.
    plan(&query, &without_decorrelation).expect("plan succeeds");
    let stats_after_second = cache.stats();
    assert_eq!(stats_after_second.misses, 2);
    assert_eq!(stats_after_second.hits, 0);

    // Same option-set as the first call: now a hit.
    plan(&query, &with_decorrelation).expect("plan succeeds");
    let stats_after_third = cache.stats();
    assert_eq!(stats_after_third.hits, 1);
    assert_eq!(stats_after_third.misses, 2);
}
