//! §8 S4 — an intermediate phase carries a symbol in `keep` purely because a
//! later expression needs it, even though no pattern in that phase mentions
//! it.

use dlplanner::ast::ExprFunction;
use dlplanner::{plan, PlannerOptions, QueryBuilder, Symbol};

#[test]
fn intermediate_phase_keeps_symbol_needed_only_by_later_expression() {
    let query = QueryBuilder::new()
        .find_var("?result")
        .pattern("?e1", ":entity/value", "?a")
        .pattern("?e1", ":entity/link", "?e2")
        .pattern("?e2", ":entity/link", "?e3")
        .pattern("?e3", ":entity/value", "?c")
        .expr(ExprFunction::Concat, &["?a", "?c"], "?result")
        .build();

    let mut options = PlannerOptions::default();
    options.fine_grained_phases = true;

    let realized = plan(&query, &options).expect("plan succeeds");
    assert!(realized.phases.len() >= 2);

    // Some phase joining ?e2 to ?e3 (neither of which binds ?a directly)
    // still keeps ?a alive for the final (str ?a ?c) ?result expression.
    let carries_a_without_binding_it = realized.phases.iter().any(|p| {
        p.keep.contains(&Symbol::new("?a"))
            && !p.provides.contains(&Symbol::new("?a"))
    });
    assert!(
        carries_a_without_binding_it,
        "a phase must pass ?a through in `keep` without (re)binding it"
    );
}
