//! §8 S5 — planner rejects an unregistered namespaced function.

use dlplanner::{plan, PlanError, PlannerOptions, QueryBuilder};

#[test]
fn unregistered_function_predicate_is_rejected() {
    let query = QueryBuilder::new()
        .find_var("?x")
        .pattern("?e", ":attr", "?x")
        .function_predicate("foo/bar", &["?x", "test"])
        .build();

    let result = plan(&query, &PlannerOptions::default());
    assert_eq!(result, Err(PlanError::UnknownFunction("foo/bar".to_string())));
}
