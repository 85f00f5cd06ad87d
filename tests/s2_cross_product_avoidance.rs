//! §8 S2 — fine-grained phases never group two disjoint patterns into the
//! same phase's `provides`.

use dlplanner::{plan, PlannerOptions, Symbol};
use dlplanner::ast::builders::QueryBuilder;

#[test]
fn disjoint_patterns_split_into_separate_phases() {
    let query = QueryBuilder::new()
        .find_var("?n1")
        .find_var("?n2")
        .pattern("?p1", ":person/name", "?n1")
        .pattern("?p2", ":person/name", "?n2")
        .build();

    let mut options = PlannerOptions::default();
    options.fine_grained_phases = true;

    let realized = plan(&query, &options).expect("plan succeeds");
    assert!(realized.phases.len() >= 2);

    let first_provides = &realized.phases[0].provides;
    let has_p1_group = first_provides.contains(&Symbol::new("?p1")) || first_provides.contains(&Symbol::new("?n1"));
    let has_p2_group = first_provides.contains(&Symbol::new("?p2")) || first_provides.contains(&Symbol::new("?n2"));
    assert!(
        !(has_p1_group && has_p2_group),
        "first phase must not provide symbols from both disjoint patterns"
    );
}
