//! §8 S3 — time-extraction pushdown: the equality on the extracted field
//! becomes a storage constraint, not a free predicate, and realization
//! reconstructs it as exactly one ordinary comparison.

use dlplanner::ast::{Clause, CompareOp};
use dlplanner::ast::TimeField;
use dlplanner::{plan, PlannerOptions, QueryBuilder};

#[test]
fn equality_on_extracted_day_becomes_storage_constraint() {
    let query = QueryBuilder::new()
        .find_var("?b")
        .find_var("?t")
        .pattern("?b", ":price/time", "?t")
        .time_extract(TimeField::Day, "?t", "?d")
        .eq("?d", 20)
        .build();

    let options = PlannerOptions::default();
    assert!(options.predicate_pushdown);

    let realized = plan(&query, &options).expect("plan succeeds");
    assert_eq!(realized.phases.len(), 1);
    let phase = &realized.phases[0];

    let reconstructed = phase
        .where_clauses
        .iter()
        .filter(|c| matches!(c, Clause::Comparison(cmp) if cmp.op == CompareOp::Eq))
        .count();
    assert_eq!(reconstructed, 1, "exactly the reconstructed (= ?d 20) comparison survives");
}
