//! # Correlated-aggregate rewriter (§4.8, optional, known-regressive)
//!
//! Off by default (`PlannerOptions::conditional_aggregate_rewriting`):
//! semantically correct but measured slower than running the subquery
//! per-tuple, so the code stays available without being the default path.

use crate::ast::{Clause, CompareOp, DataPattern, ExprArg, ExprFunction, Expression, FindElem};
use crate::plan::{ConditionalAggregate, Phase, PatternPlan, SubqueryPlan};
use crate::scoring::{bound_mask, bound_variables, select_index};
use crate::symbol::Symbol;
use std::collections::HashSet;

struct Trigger {
    aggregate: FindElem,
    /// `(inner_var, outer_var)` pairs: the inner variable the correlation
    /// predicate compares, and the outer-scope symbol it aligns to via the
    /// subquery's own argument list.
    correlation_pairs: Vec<(Symbol, Symbol)>,
}

fn detect_trigger(sq: &SubqueryPlan) -> Option<Trigger> {
    let nested = &sq.clause.query;
    if nested.find.len() != 1 {
        return None;
    }
    let aggregate = nested.find[0].clone();
    if !aggregate.is_aggregate() {
        return None;
    }

    let params: Vec<Symbol> = nested.value_inputs().cloned().collect();
    if params.is_empty() {
        return None;
    }
    let outer_args: Vec<Symbol> = sq.clause.outer_symbols().cloned().collect();
    let param_to_outer: Vec<(Symbol, Symbol)> = params.into_iter().zip(outer_args).collect();

    let mut correlation_pairs = Vec::new();
    for clause in &nested.where_clauses {
        if let Clause::Comparison(c) = clause {
            if c.op != CompareOp::Eq {
                continue;
            }
            if let (Some(l), Some(r)) = (c.left.as_var(), c.right.as_var()) {
                for (param, outer) in &param_to_outer {
                    if l == param {
                        correlation_pairs.push((r.clone(), outer.clone()));
                    } else if r == param {
                        correlation_pairs.push((l.clone(), outer.clone()));
                    }
                }
            }
        }
    }

    if correlation_pairs.is_empty() {
        None
    } else {
        Some(Trigger { aggregate, correlation_pairs })
    }
}

fn plan_inlined_pattern(pattern: &DataPattern, resolved: &HashSet<Symbol>) -> PatternPlan {
    let mask = bound_mask(pattern, resolved);
    let index = select_index(mask);
    let binds = bound_variables(pattern, resolved);
    PatternPlan {
        pattern: pattern.clone(),
        index,
        bound: mask,
        // Inlined by the rewriter rather than scored by the greedy phase
        // builder; left unplannable-sentinel since no comparable score
        // exists yet for a pattern injected mid-phase.
        selectivity: crate::plan::UNPLANNABLE,
        binds,
        constraints: Vec::new(),
    }
}

fn rewrite_phase(phase: &mut Phase) -> bool {
    let mut new_expressions: Vec<Expression> = Vec::new();
    let mut new_patterns: Vec<PatternPlan> = Vec::new();
    let mut aggregate_required: Vec<Symbol> = Vec::new();
    let mut conditional_aggregates: Vec<ConditionalAggregate> = Vec::new();
    let mut removed_bindings: HashSet<Symbol> = HashSet::new();
    let mut resolved: HashSet<Symbol> = phase.provides.iter().cloned().collect();
    let mut any_rewritten = false;

    for (i, sq) in phase.subqueries.iter_mut().enumerate() {
        if sq.decorrelated {
            continue;
        }
        let Some(trigger) = detect_trigger(sq) else {
            continue;
        };

        let mut cond_symbols = Vec::new();
        for (n, (inner_var, outer_var)) in trigger.correlation_pairs.iter().enumerate() {
            let cond_sym = Symbol::new(format!("?__cond{i}_{n}"));
            new_expressions.push(Expression {
                function: ExprFunction::ComparisonAsFunction(CompareOp::Eq),
                args: vec![ExprArg::Var(inner_var.clone()), ExprArg::Var(outer_var.clone())],
                binding: cond_sym.clone(),
            });
            resolved.insert(cond_sym.clone());
            cond_symbols.push(cond_sym);
        }

        let filter_symbol = if cond_symbols.len() == 1 {
            cond_symbols.into_iter().next().unwrap()
        } else {
            let combined = Symbol::new(format!("?__cond_and_{i}"));
            new_expressions.push(Expression {
                function: ExprFunction::Named("and".to_string()),
                args: cond_symbols.into_iter().map(ExprArg::Var).collect(),
                binding: combined.clone(),
            });
            resolved.insert(combined.clone());
            combined
        };

        for clause in &sq.clause.query.where_clauses {
            if let Clause::DataPattern(p) = clause {
                let planned = plan_inlined_pattern(p, &resolved);
                resolved.extend(planned.binds.iter().cloned());
                new_patterns.push(planned);
            }
        }

        removed_bindings.extend(sq.clause.binding.symbols());
        aggregate_required.extend(trigger.correlation_pairs.iter().map(|(_, outer)| outer.clone()));

        let binding = sq
            .clause
            .binding
            .symbols()
            .into_iter()
            .next()
            .unwrap_or_else(|| Symbol::new("?__unbound_aggregate"));
        conditional_aggregates.push(ConditionalAggregate {
            binding,
            aggregate: trigger.aggregate,
            filter_symbol,
        });

        sq.decorrelated = true;
        any_rewritten = true;
    }

    if !any_rewritten {
        return false;
    }

    phase.expressions.extend(new_expressions);
    phase.patterns.extend(new_patterns);
    phase.provides.retain(|s| !removed_bindings.contains(s));
    phase.provides.extend(aggregate_required.iter().cloned());
    phase.metadata.aggregate_required_columns.extend(aggregate_required);
    phase.metadata.conditional_aggregates.extend(conditional_aggregates);

    true
}

/// Run the rewrite over every phase (§4.8). Returns whether any phase was
/// rewritten, so the caller knows whether post-fixup (re-running expression
/// placement and relocating `aggregate_required_columns`) is needed.
pub fn rewrite_correlated_aggregates(phases: &mut [Phase]) -> bool {
    let mut any = false;
    for phase in phases.iter_mut() {
        if rewrite_phase(phase) {
            any = true;
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::ast::{AggregateFunc, BindingForm, SubqueryInput};
    use crate::options::PlannerOptions;
    use crate::phase_builder::build_phases;
    use crate::subquery_assign::assign_subqueries;

    fn nested_aggregate_query() -> crate::ast::Query {
        QueryBuilder::new()
            .find_aggregate(AggregateFunc::Count, "?order")
            .input("$")
            .input("?min_age")
            .pattern("?order", ":order/customer", "?cust")
            .pattern("?cust", ":customer/age", "?age")
            .comparison(CompareOp::Eq, "?age", "?min_age")
            .build()
    }

    #[test]
    fn trigger_fires_for_single_aggregate_correlated_subquery() {
        let q = QueryBuilder::new()
            .find_var("?cust")
            .find_var("?age")
            .pattern("?cust", ":customer/age", "?age")
            .subquery(crate::ast::SubqueryPattern {
                query: Box::new(nested_aggregate_query()),
                inputs: vec![SubqueryInput::Database, SubqueryInput::Symbol(Symbol::new("?age"))],
                binding: BindingForm::Scalar(Symbol::new("?order_count")),
            })
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        let opts = PlannerOptions::default();
        assign_subqueries(&mut phases, &q, &[], &opts).unwrap();
        let rewritten = rewrite_correlated_aggregates(&mut phases);
        assert!(rewritten);
        assert!(phases[0].subqueries[0].decorrelated);
        assert_eq!(phases[0].metadata.conditional_aggregates.len(), 1);
        assert!(!phases[0].provides.contains(&Symbol::new("?order_count")));
    }

    #[test]
    fn no_trigger_when_aggregate_missing() {
        let q = QueryBuilder::new()
            .find_var("?cust")
            .pattern("?cust", ":customer/age", "?age")
            .subquery(crate::ast::SubqueryPattern {
                query: Box::new(
                    QueryBuilder::new()
                        .find_var("?n")
                        .input("$")
                        .input("?cust")
                        .pattern("?cust", ":customer/name", "?n")
                        .build(),
                ),
                inputs: vec![SubqueryInput::Database, SubqueryInput::Symbol(Symbol::new("?cust"))],
                binding: BindingForm::Scalar(Symbol::new("?n")),
            })
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        let opts = PlannerOptions::default();
        assign_subqueries(&mut phases, &q, &[], &opts).unwrap();
        assert!(!rewrite_correlated_aggregates(&mut phases));
    }
}
