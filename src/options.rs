//! # Planner options (§6 External Interfaces)

use crate::cache::PlanCache;
use crate::registry::FunctionRegistry;
use crate::statistics::{NoStatistics, Statistics};
use std::collections::HashSet;
use std::sync::Arc;

/// Attributes recognized as "time" attributes for time-extraction pushdown
/// (§4.7: "the predefined set, e.g. `:price/time`, `:bar/time`"). The spec
/// names examples rather than an exhaustive list, so this is extended via
/// `PlannerOptions::time_attributes` / `PlannerConfig` rather than hardcoded
/// everywhere the check happens.
pub const DEFAULT_TIME_ATTRIBUTES: &[&str] = &[":price/time", ":bar/time", ":event/time", ":order/time"];

fn default_time_attributes() -> Arc<HashSet<String>> {
    Arc::new(DEFAULT_TIME_ATTRIBUTES.iter().map(|s| (*s).to_string()).collect())
}

/// Recognized plan-shape-affecting flags plus the collaborators (statistics,
/// function registry, cache) a `plan()` call needs. Only the boolean flags
/// enumerated in §6's table (plus `max_phases`) participate in the plan
/// cache key (§4.14) — see [`PlannerOptions::cache_key_fields`].
#[derive(Clone)]
pub struct PlannerOptions {
    pub dynamic_reordering: bool,
    pub predicate_pushdown: bool,
    pub conditional_aggregate_rewriting: bool,
    pub subquery_decorrelation: bool,
    pub enable_cse: bool,
    pub semantic_rewriting: bool,
    pub fine_grained_phases: bool,
    /// 0 = unlimited.
    pub max_phases: usize,
    pub use_clause_based_planner: bool,

    pub statistics: Arc<dyn Statistics>,
    pub registry: Arc<FunctionRegistry>,
    /// `None` is the idiomatic stand-in for spec.md §4.14's "null receiver
    /// must be tolerated as cache disabled" (see `DESIGN.md` Open Question
    /// 2).
    pub cache: Option<Arc<PlanCache>>,

    /// Recursion-depth guard for nested subquery planning (§9 Design
    /// Notes). Not a cache-key field: it bounds *how* planning runs, not
    /// the resulting plan's shape.
    pub max_subquery_depth: usize,

    /// Attributes eligible for time-extraction storage constraints (§4.7).
    /// Not a cache-key field, same treatment as `statistics`/`registry`.
    pub time_attributes: Arc<HashSet<String>>,
}

impl PlannerOptions {
    /// The subset of flags that affect plan shape, in the fixed order
    /// [`crate::cache::cache_key`] hashes them in (§4.14: "the subset of
    /// option flags that affect plan shape").
    pub fn cache_key_fields(&self) -> [bool; 7] {
        [
            self.dynamic_reordering,
            self.predicate_pushdown,
            self.conditional_aggregate_rewriting,
            self.subquery_decorrelation,
            self.enable_cse,
            self.semantic_rewriting,
            self.fine_grained_phases,
        ]
    }
}

impl std::fmt::Debug for PlannerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerOptions")
            .field("dynamic_reordering", &self.dynamic_reordering)
            .field("predicate_pushdown", &self.predicate_pushdown)
            .field(
                "conditional_aggregate_rewriting",
                &self.conditional_aggregate_rewriting,
            )
            .field("subquery_decorrelation", &self.subquery_decorrelation)
            .field("enable_cse", &self.enable_cse)
            .field("semantic_rewriting", &self.semantic_rewriting)
            .field("fine_grained_phases", &self.fine_grained_phases)
            .field("max_phases", &self.max_phases)
            .field("use_clause_based_planner", &self.use_clause_based_planner)
            .field("cache", &self.cache.is_some())
            .field("max_subquery_depth", &self.max_subquery_depth)
            .field("time_attributes", &self.time_attributes.len())
            .finish()
    }
}

impl Default for PlannerOptions {
    /// Conservative defaults: dynamic reordering and pushdown on (they are
    /// pure wins), the known-regressive correlated-aggregate rewriter off
    /// per §4.8 Status, decorrelation and CSE off (a more invasive
    /// rewrite a caller opts into), no cache.
    fn default() -> Self {
        PlannerOptions {
            dynamic_reordering: true,
            predicate_pushdown: true,
            conditional_aggregate_rewriting: false,
            subquery_decorrelation: false,
            enable_cse: false,
            semantic_rewriting: true,
            fine_grained_phases: false,
            max_phases: 0,
            use_clause_based_planner: false,
            statistics: Arc::new(NoStatistics),
            registry: Arc::new(crate::registry::builtin()),
            cache: None,
            max_subquery_depth: 64,
            time_attributes: default_time_attributes(),
        }
    }
}
