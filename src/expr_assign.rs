//! # Expression assignment (§4.4)

use crate::ast::{Clause, Expression, Query};
use crate::plan::Phase;
use crate::symbols::pattern_and_subquery_provides;
use crate::symbol::Symbol;
use std::collections::HashSet;

fn free_vars(expr: &Expression) -> HashSet<Symbol> {
    expr.args.iter().filter_map(|a| a.as_var().cloned()).collect()
}

/// Place every `Expression` clause in the earliest phase where its inputs
/// resolve (§4.4). Re-entrant: always clears prior expression assignments
/// and resets each phase's `provides` to the pattern/subquery baseline
/// before re-placing, so it can be called again after reordering or after
/// the correlated-aggregate rewriter's post-fixup without accumulating
/// stale state.
pub fn assign_expressions(phases: &mut [Phase], query: &Query, input_symbols: &[Symbol]) {
    for phase in phases.iter_mut() {
        phase.expressions.clear();
        phase.provides = pattern_and_subquery_provides(phase);
    }

    let exprs: Vec<Expression> = query
        .where_clauses
        .iter()
        .filter_map(|c| match c {
            Clause::Expression(e) => Some(e.clone()),
            _ => None,
        })
        .collect();

    let base: HashSet<Symbol> = input_symbols.iter().cloned().collect();

    for expr in exprs {
        let inputs = free_vars(&expr);
        let mut cumulative = base.clone();
        let mut placed = false;

        for phase in phases.iter_mut() {
            let provides_now: HashSet<Symbol> = phase.provides.iter().cloned().collect();
            let visible: HashSet<Symbol> = cumulative.union(&provides_now).cloned().collect();
            if inputs.iter().all(|s| visible.contains(s)) {
                phase.provides.push(expr.binding.clone());
                phase.expressions.push(expr.clone());
                placed = true;
                break;
            }
            cumulative.extend(provides_now);
        }

        if !placed {
            if let Some(last) = phases.last_mut() {
                last.provides.push(expr.binding.clone());
                last.expressions.push(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::ast::{ExprFunction, TimeField};
    use crate::options::PlannerOptions;
    use crate::phase_builder::build_phases;

    #[test]
    fn s4_symbol_passthrough_expression_finds_earliest_phase() {
        let q = QueryBuilder::new()
            .find_var("?result")
            .pattern("?e1", ":entity/value", "?a")
            .pattern("?e1", ":entity/link", "?e2")
            .pattern("?e2", ":entity/link", "?e3")
            .pattern("?e3", ":entity/value", "?c")
            .expr(ExprFunction::Concat, &["?a", "?c"], "?result")
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);

        let placed_phase = phases
            .iter()
            .position(|p| p.expressions.iter().any(|e| e.binding.as_str() == "?result"));
        assert!(placed_phase.is_some());
    }

    #[test]
    fn time_extraction_expression_placed_with_its_pattern() {
        let q = QueryBuilder::new()
            .find_var("?b")
            .find_var("?t")
            .pattern("?b", ":price/time", "?t")
            .time_extract(TimeField::Day, "?t", "?d")
            .eq("?d", 20)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].expressions.len(), 1);
    }

    #[test]
    fn unplaceable_expression_falls_back_to_last_phase() {
        let q = QueryBuilder::new()
            .find_var("?z")
            .pattern("?e", ":a", "?v")
            .expr(ExprFunction::Identity, &["?unbound"], "?z")
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assert!(phases.last().unwrap().expressions.iter().any(|e| e.binding.as_str() == "?z"));
    }
}
