//! # Planner orchestration (§6 External Interfaces)
//!
//! Wires §4.3-§4.13 into the two entry points callers actually use: [`plan`]
//! for a top-level query, [`plan_with_bindings`] for anything that already
//! has symbols resolved before phase 0 (subqueries, §4.6; decorrelation's
//! merged queries, §4.9).

use crate::ast::Query;
use crate::cache::CacheKey;
use crate::error::{PlanError, PlanResult};
use crate::expr_assign::assign_expressions;
use crate::options::PlannerOptions;
use crate::phase_builder::build_phases;
use crate::predicate_assign::assign_predicates;
use crate::pushdown::pushdown;
use crate::realize::{realize, RealizedPlan};
use crate::reorder::reorder_phases;
use crate::rewrite::{correlated_aggregate, decorrelate};
use crate::subquery_assign::assign_subqueries;
use crate::symbol::Symbol;
use crate::symbols::recompute_symbol_sets;
use crate::validate::validate;
use std::sync::Arc;

/// Plan `query` with no pre-bound symbols.
pub fn plan(query: &Query, options: &PlannerOptions) -> PlanResult<RealizedPlan> {
    plan_with_bindings(query, &[], options)
}

/// Plan `query`, treating `pre_bound_symbols` as already resolved before
/// phase 0. Cache lookups/stores happen here, keyed on `(query, options)` —
/// a failing plan is never cached (§7).
#[tracing::instrument(skip(query, options), fields(where_clauses = query.where_clauses.len()))]
pub fn plan_with_bindings(
    query: &Query,
    pre_bound_symbols: &[Symbol],
    options: &PlannerOptions,
) -> PlanResult<RealizedPlan> {
    if query.find.is_empty() {
        return Err(PlanError::InvalidQuery("query has an empty :find clause".to_string()));
    }

    if let Some(cache) = &options.cache {
        let cache_key = CacheKey::compute(query, options);
        if let Some(hit) = cache.get(query, options) {
            tracing::debug!(cache_key = ?cache_key, "plan_cache_hit");
            return Ok((*hit).clone());
        }
        tracing::trace!(cache_key = ?cache_key, "plan_cache_miss");
    }

    let mut phases = build_phases(query, options);

    assign_expressions(&mut phases, query, pre_bound_symbols);
    assign_predicates(&mut phases, query, pre_bound_symbols)?;

    pushdown(&mut phases, options);

    assign_subqueries(&mut phases, query, pre_bound_symbols, options)?;

    if options.conditional_aggregate_rewriting
        && correlated_aggregate::rewrite_correlated_aggregates(&mut phases)
    {
        assign_expressions(&mut phases, query, pre_bound_symbols);
    }

    if options.subquery_decorrelation {
        decorrelate::decorrelate_subqueries(&mut phases, options)?;
    }

    if options.dynamic_reordering {
        phases = reorder_phases(phases, pre_bound_symbols);
    }

    if options.max_phases != 0 && phases.len() > options.max_phases {
        return Err(PlanError::TooManyPhases { max: options.max_phases, actual: phases.len() });
    }

    recompute_symbol_sets(&mut phases, query, pre_bound_symbols);
    validate(query, &phases, pre_bound_symbols, &options.registry)?;

    let realized = realize(query, &phases);

    if let Some(cache) = &options.cache {
        let cache_key = CacheKey::compute(query, options);
        cache.set(query, options, Arc::new(realized.clone()));
        tracing::debug!(cache_key = ?cache_key, phase_count = realized.phases.len(), "plan_cache_store");
    }

    Ok(realized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::ast::TimeField;
    use crate::cache::{CacheConfig, PlanCache};

    #[test]
    fn s1_simple_filter_plans_in_one_phase() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .find_var("?n")
            .pattern("?e", ":person/name", "?n")
            .gt("?e", 100)
            .build();
        let realized = plan(&q, &PlannerOptions::default()).unwrap();
        assert_eq!(realized.phases.len(), 1);
        assert_eq!(realized.phases[0].find, q.find);
    }

    #[test]
    fn s4_expression_and_time_extraction_plan_together() {
        let q = QueryBuilder::new()
            .find_var("?b")
            .find_var("?d")
            .pattern("?b", ":price/time", "?t")
            .time_extract(TimeField::Day, "?t", "?d")
            .eq("?d", 20)
            .build();
        let realized = plan(&q, &PlannerOptions::default()).unwrap();
        assert!(!realized.phases.is_empty());
    }

    #[test]
    fn empty_find_is_rejected() {
        let q = QueryBuilder::new().pattern("?e", ":a", "?v").build();
        let result = plan(&q, &PlannerOptions::default());
        assert!(matches!(result, Err(PlanError::InvalidQuery(_))));
    }

    #[test]
    fn unknown_function_surfaces_as_validation_error() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .pattern("?e", ":a", "?v")
            .function_predicate("foo/bar", &["?v"])
            .build();
        let result = plan(&q, &PlannerOptions::default());
        assert_eq!(result, Err(PlanError::UnknownFunction("foo/bar".to_string())));
    }

    #[test]
    fn second_plan_call_hits_cache() {
        let q = QueryBuilder::new().find_var("?e").pattern("?e", ":a", "?v").build();
        let mut opts = PlannerOptions::default();
        opts.cache = Some(Arc::new(PlanCache::new(CacheConfig::default())));
        plan(&q, &opts).unwrap();
        plan(&q, &opts).unwrap();
        let stats = opts.cache.as_ref().unwrap().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn correlated_aggregate_rewrite_runs_when_enabled() {
        use crate::ast::{AggregateFunc, BindingForm, SubqueryInput};
        use crate::symbol::Symbol;

        let nested = QueryBuilder::new()
            .find_aggregate(AggregateFunc::Count, "?order")
            .input("$")
            .input("?min_age")
            .pattern("?order", ":order/customer", "?cust")
            .pattern("?cust", ":customer/age", "?age")
            .comparison(crate::ast::CompareOp::Eq, "?age", "?min_age")
            .build();

        let q = QueryBuilder::new()
            .find_var("?cust")
            .find_var("?age")
            .pattern("?cust", ":customer/age", "?age")
            .subquery(crate::ast::SubqueryPattern {
                query: Box::new(nested),
                inputs: vec![SubqueryInput::Database, SubqueryInput::Symbol(Symbol::new("?age"))],
                binding: BindingForm::Scalar(Symbol::new("?order_count")),
            })
            .build();

        let mut opts = PlannerOptions::default();
        opts.conditional_aggregate_rewriting = true;
        let realized = plan(&q, &opts).unwrap();
        assert!(!realized.phases.is_empty());
    }
}
