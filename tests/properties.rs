//! §8 Testable Properties, 1/2/4 (determinism, dependency safety, keep
//! subset law) over small generated queries. Properties 5/7/8/9 require a
//! reference executor, which is out of scope for this crate (§1 Non-goals);
//! 3 and 6 already have dedicated scenario coverage in `tests/s5_*` /
//! `tests/s6_*`.

use dlplanner::analysis::clause_symbols;
use dlplanner::{plan, PlannerOptions, QueryBuilder};
use proptest::prelude::*;

fn arb_query() -> impl Strategy<Value = dlplanner::Query> {
    (1usize..=4, any::<i64>(), any::<bool>()).prop_map(|(n, threshold, fine_grained)| {
        let mut builder = QueryBuilder::new();
        for i in 0..n {
            let e = format!("?e{i}");
            let a = format!(":attr{i}/value");
            let v = format!("?v{i}");
            builder = builder.find_var(&v).pattern(&e, &a, &v);
        }
        builder = builder.gt("?v0", threshold);
        let _ = fine_grained;
        builder.build()
    })
}

fn arb_options() -> impl Strategy<Value = PlannerOptions> {
    any::<bool>().prop_map(|fine_grained_phases| {
        let mut options = PlannerOptions::default();
        options.fine_grained_phases = fine_grained_phases;
        options
    })
}

proptest! {
    #[test]
    fn plan_is_deterministic(query in arb_query(), options in arb_options()) {
        let first = plan(&query, &options);
        let second = plan(&query, &options);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn keep_is_subset_of_available_and_provides(query in arb_query(), options in arb_options()) {
        let Ok(realized) = plan(&query, &options) else { return Ok(()); };
        for phase in &realized.phases {
            for sym in &phase.keep {
                prop_assert!(
                    phase.available.contains(sym) || phase.provides.contains(sym),
                    "keep symbol {:?} not in available or provides", sym
                );
            }
        }
    }

    #[test]
    fn find_variables_are_reachable(query in arb_query(), options in arb_options()) {
        let Ok(realized) = plan(&query, &options) else { return Ok(()); };
        let provided: std::collections::HashSet<_> =
            realized.phases.iter().flat_map(|p| p.provides.iter().cloned()).collect();
        for find_elem in &query.find {
            prop_assert!(provided.contains(find_elem.symbol()));
        }
    }

    #[test]
    fn every_where_clause_requires_only_available_symbols(query in arb_query(), options in arb_options()) {
        let Ok(realized) = plan(&query, &options) else { return Ok(()); };
        for phase in &realized.phases {
            let mut bound: std::collections::HashSet<_> = phase.available.iter().cloned().collect();
            for clause in &phase.where_clauses {
                let symbols = clause_symbols(clause);
                for required in &symbols.requires {
                    prop_assert!(
                        bound.contains(required),
                        "clause requires {:?} before it is bound", required
                    );
                }
                bound.extend(symbols.provides);
            }
        }
    }
}
