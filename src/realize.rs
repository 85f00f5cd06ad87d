//! # Realizer (§4.13)
//!
//! Flattens the mutable, in-progress [`crate::plan::Phase`] sequence into the
//! executor-facing [`RealizedPlan`]: plain `:find`/`:in`/`:where` triples in
//! the fixed clause order patterns → expressions → predicates →
//! reconstructed-from-constraints predicates → join predicates → subqueries.

use crate::ast::{Clause, CompareOp, Comparison, ExprArg, FindElem, Query};
use crate::plan::{Phase, PatternPlan, StorageConstraint};
use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// One phase of a realized plan, ready for an executor to run as an
/// independent query against its declared `inputs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedPhase {
    pub find: Vec<FindElem>,
    pub inputs: Vec<Symbol>,
    pub where_clauses: Vec<Clause>,
    pub available: Vec<Symbol>,
    pub provides: Vec<Symbol>,
    pub keep: Vec<Symbol>,
}

/// The fully realized, executor-ready plan: the original query plus its
/// ordered phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedPlan {
    pub query: Query,
    pub phases: Vec<RealizedPhase>,
}

fn reconstruct_constraint(pattern: &PatternPlan, constraint: &StorageConstraint) -> Option<Clause> {
    match constraint {
        StorageConstraint::Equality { value, .. } => Some(Clause::Comparison(Comparison {
            op: CompareOp::Eq,
            left: ExprArg::Var(pattern.value_symbol()?.clone()),
            right: ExprArg::Const(value.clone()),
        })),
        StorageConstraint::Range { op, value, .. } => Some(Clause::Comparison(Comparison {
            op: *op,
            left: ExprArg::Var(pattern.value_symbol()?.clone()),
            right: ExprArg::Const(value.clone()),
        })),
        StorageConstraint::TimeExtraction { op, value, extracted_symbol, .. } => {
            Some(Clause::Comparison(Comparison {
                op: *op,
                left: ExprArg::Var(extracted_symbol.clone()),
                right: ExprArg::Const(value.clone()),
            }))
        }
    }
}

fn realize_phase(
    phase: &Phase,
    prev_keep: Option<&[Symbol]>,
    database_symbol: Option<&Symbol>,
) -> RealizedPhase {
    let mut where_clauses: Vec<Clause> = Vec::new();

    for p in &phase.patterns {
        where_clauses.push(Clause::DataPattern(p.pattern.clone()));
    }
    for e in &phase.expressions {
        where_clauses.push(Clause::Expression(e.clone()));
    }
    for pred in &phase.predicates {
        where_clauses.push(pred.clause.clone());
    }
    for p in &phase.patterns {
        for c in &p.constraints {
            if let Some(clause) = reconstruct_constraint(p, c) {
                where_clauses.push(clause);
            }
        }
    }
    for jp in &phase.join_predicates {
        where_clauses.push(jp.clause.clone());
    }
    for s in &phase.subqueries {
        where_clauses.push(Clause::SubqueryPattern(s.clause.clone()));
    }

    let find = phase
        .find
        .clone()
        .unwrap_or_else(|| phase.keep.iter().cloned().map(FindElem::Variable).collect());

    let mut inputs: Vec<Symbol> = Vec::new();
    if let Some(db) = database_symbol {
        inputs.push(db.clone());
    }
    if let Some(prev) = prev_keep {
        inputs.extend(prev.iter().cloned());
    }

    RealizedPhase {
        find,
        inputs,
        where_clauses,
        available: phase.available.clone(),
        provides: phase.provides.clone(),
        keep: phase.keep.clone(),
    }
}

/// Realize a final-order, symbol-set-complete phase sequence into a
/// [`RealizedPlan`] (§4.13).
pub fn realize(query: &Query, phases: &[Phase]) -> RealizedPlan {
    let database_symbol = query.database_input().cloned();
    let mut realized_phases = Vec::with_capacity(phases.len());
    let mut prev_keep: Option<Vec<Symbol>> = None;

    for (i, phase) in phases.iter().enumerate() {
        // Every phase after the first re-queries storage, so it always
        // declares a database input even if the outer query never took one.
        let db_for_phase = if i == 0 { database_symbol.clone() } else { Some(Symbol::new("$")) };
        let realized = realize_phase(phase, prev_keep.as_deref(), db_for_phase.as_ref());
        prev_keep = Some(phase.keep.clone());
        realized_phases.push(realized);
    }

    RealizedPlan { query: query.clone(), phases: realized_phases }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::expr_assign::assign_expressions;
    use crate::options::PlannerOptions;
    use crate::phase_builder::build_phases;
    use crate::predicate_assign::assign_predicates;
    use crate::pushdown::pushdown;
    use crate::symbols::recompute_symbol_sets;

    #[test]
    fn s1_realizes_single_phase_with_original_find() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .find_var("?n")
            .pattern("?e", ":person/name", "?n")
            .gt("?e", 100)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        recompute_symbol_sets(&mut phases, &q, &[]);

        let realized = realize(&q, &phases);
        assert_eq!(realized.phases.len(), 1);
        assert_eq!(realized.phases[0].find, q.find);
        assert!(realized.phases[0].where_clauses.iter().any(|c| c.is_pattern()));
        assert!(realized.phases[0].where_clauses.iter().any(|c| matches!(c, Clause::Comparison(_))));
    }

    #[test]
    fn equality_storage_constraint_is_reconstructed_as_predicate() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .pattern("?e", ":person/age", "?a")
            .eq("?a", 30)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        let opts = PlannerOptions::default();
        pushdown(&mut phases, &opts);
        recompute_symbol_sets(&mut phases, &q, &[]);

        let realized = realize(&q, &phases);
        let reconstructed = realized.phases[0]
            .where_clauses
            .iter()
            .filter(|c| matches!(c, Clause::Comparison(comp) if comp.op == CompareOp::Eq))
            .count();
        assert_eq!(reconstructed, 1);
    }

    #[test]
    fn second_phase_declares_relation_input_from_prior_keep() {
        let q = QueryBuilder::new()
            .find_var("?n1")
            .find_var("?n2")
            .pattern("?p1", ":person/name", "?n1")
            .pattern("?p2", ":person/name", "?n2")
            .build();
        let mut opts = PlannerOptions::default();
        opts.fine_grained_phases = true;
        let mut phases = build_phases(&q, &opts);
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        recompute_symbol_sets(&mut phases, &q, &[]);

        assert!(phases.len() >= 2);
        let realized = realize(&q, &phases);
        let second = &realized.phases[1];
        assert!(!second.inputs.is_empty());
        assert_eq!(second.inputs[0], Symbol::new("$"));
    }
}
