//! # Subquery assignment (§4.6)
//!
//! Places each `[(q nested-query in-args...) binding-form]` clause in the
//! earliest phase whose outer-scope argument symbols are already resolved,
//! then plans the nested query recursively (seeded from its own declared
//! `:in` parameters, which is what makes alpha-renaming between the outer
//! and nested scope a non-issue: the nested plan only ever sees its own
//! symbol names).

use crate::ast::{Clause, Query, SubqueryPattern};
use crate::error::{PlanError, PlanResult};
use crate::options::PlannerOptions;
use crate::plan::{Phase, SubqueryPlan};
use crate::symbol::Symbol;
use std::collections::HashSet;

/// One fewer level of nesting budget for the recursive call, erroring once
/// the budget is exhausted rather than recursing forever on a malformed or
/// adversarial query (§9 Design Notes).
fn descend(options: &PlannerOptions) -> PlanResult<PlannerOptions> {
    if options.max_subquery_depth == 0 {
        return Err(PlanError::InvalidQuery(
            "subquery nesting exceeds max_subquery_depth".to_string(),
        ));
    }
    let mut nested = options.clone();
    nested.max_subquery_depth -= 1;
    Ok(nested)
}

fn plan_nested(sq: &SubqueryPattern, options: &PlannerOptions) -> PlanResult<SubqueryPlan> {
    let nested_options = descend(options)?;
    let nested_input_symbols: Vec<Symbol> = sq.query.value_inputs().cloned().collect();
    let nested = crate::planner::plan_with_bindings(&sq.query, &nested_input_symbols, &nested_options)
        .map_err(|e| PlanError::NestedPlanError(Box::new(e)))?;
    Ok(SubqueryPlan {
        clause: sq.clone(),
        nested,
        decorrelated: false,
    })
}

/// Place every subquery clause (§4.6). Re-entrant: clears prior placements
/// (including the symbols they contributed to `provides`) before re-placing,
/// so it can run again after the decorrelator/rewriter's post-fixup.
pub fn assign_subqueries(
    phases: &mut [Phase],
    query: &Query,
    input_symbols: &[Symbol],
    options: &PlannerOptions,
) -> PlanResult<()> {
    for phase in phases.iter_mut() {
        let stale: HashSet<Symbol> = phase
            .subqueries
            .iter()
            .flat_map(|s| s.clause.binding.symbols())
            .collect();
        phase.provides.retain(|s| !stale.contains(s));
        phase.subqueries.clear();
    }

    if phases.is_empty() {
        return Ok(());
    }

    let subqueries: Vec<SubqueryPattern> = query
        .where_clauses
        .iter()
        .filter_map(|c| match c {
            Clause::SubqueryPattern(s) => Some(s.clone()),
            _ => None,
        })
        .collect();

    let base: HashSet<Symbol> = input_symbols.iter().cloned().collect();

    for sq in subqueries {
        let required: HashSet<Symbol> = sq.outer_symbols().cloned().collect();
        let mut cumulative = base.clone();
        let mut placed = false;

        for phase in phases.iter_mut() {
            let provides_now: HashSet<Symbol> = phase.provides.iter().cloned().collect();
            let visible: HashSet<Symbol> = cumulative.union(&provides_now).cloned().collect();

            if required.iter().all(|s| visible.contains(s)) {
                let subquery_plan = plan_nested(&sq, options)?;
                phase.provides.extend(sq.binding.symbols());
                phase.subqueries.push(subquery_plan);
                placed = true;
                break;
            }
            cumulative.extend(provides_now);
        }

        if !placed {
            return Err(PlanError::InvalidQuery(format!(
                "subquery requires unresolved symbols: {:?}",
                required
            )));
        }
    }

    Ok(())
}
