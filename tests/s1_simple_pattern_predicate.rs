//! §8 S1 — simple pattern + predicate.

use dlplanner::ast::{Clause, CompareOp};
use dlplanner::{plan, PlannerOptions, QueryBuilder, Symbol};

#[test]
fn single_phase_with_predicate_and_keep() {
    let query = QueryBuilder::new()
        .find_var("?e")
        .find_var("?n")
        .pattern("?e", ":person/name", "?n")
        .gt("?e", 100)
        .build();

    let realized = plan(&query, &PlannerOptions::default()).expect("plan succeeds");

    assert_eq!(realized.phases.len(), 1);
    let phase = &realized.phases[0];

    assert!(phase
        .where_clauses
        .iter()
        .any(|c| matches!(c, Clause::DataPattern(p) if p.e.as_variable().is_some() && p.v.as_variable().is_some())));
    assert!(phase
        .where_clauses
        .iter()
        .any(|c| matches!(c, Clause::Comparison(cmp) if cmp.op == CompareOp::Gt)));
    assert!(phase.keep.contains(&Symbol::new("?e")));
    assert!(phase.keep.contains(&Symbol::new("?n")));
}
