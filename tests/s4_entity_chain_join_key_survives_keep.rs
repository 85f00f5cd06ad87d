//! §4.11 step 3 — a join-key symbol a pattern reuses (not a value a
//! predicate/expression/subquery *requires*) must still survive in an
//! earlier phase's `keep` so the later phase actually joins against it
//! instead of rescanning its attribute unconstrained.

use dlplanner::{plan, PlannerOptions, QueryBuilder, Symbol};

#[test]
fn entity_chain_keeps_intermediate_join_keys() {
    // Default (non-fine-grained) phase construction groups these four
    // patterns by entity-position symbol into three phases: {?e1, ?e1},
    // {?e2}, {?e3}. The phase producing ?e2 never *requires* it (no
    // predicate/expression/subquery reads it) but the next phase's pattern
    // `[?e2 :entity/link ?e3]` needs ?e2 bound to actually join rather than
    // scan every `:entity/link` fact.
    let query = QueryBuilder::new()
        .find_var("?c")
        .pattern("?e1", ":entity/value", "?a")
        .pattern("?e1", ":entity/link", "?e2")
        .pattern("?e2", ":entity/link", "?e3")
        .pattern("?e3", ":entity/value", "?c")
        .build();

    let realized = plan(&query, &PlannerOptions::default()).expect("plan succeeds");
    assert!(realized.phases.len() >= 2, "entity grouping should split this into multiple phases");

    let e2 = Symbol::new("?e2");
    let e3 = Symbol::new("?e3");

    // Find the phase that provides ?e2 and the phase whose pattern needs
    // ?e2 already bound (the one providing ?e3 via `[?e2 :entity/link ?e3]`).
    let e2_provider = realized
        .phases
        .iter()
        .position(|p| p.provides.contains(&e2))
        .expect("some phase must provide ?e2");
    let e3_provider = realized
        .phases
        .iter()
        .position(|p| p.provides.contains(&e3))
        .expect("some phase must provide ?e3");

    assert!(e3_provider > e2_provider, "the ?e3-producing phase must run after the ?e2-producing one");

    // The phase producing ?e3 must receive ?e2 as an input, proving the
    // join key survived in the previous phase's `keep`/`inputs` chain
    // instead of being dropped and re-scanned unconstrained.
    assert!(
        realized.phases[e3_provider].inputs.contains(&e2),
        "phase producing ?e3 must receive ?e2 as a join key input, found inputs: {:?}",
        realized.phases[e3_provider].inputs
    );
}
