//! # Pattern scoring & index selection (§4.2)

use crate::ast::{DataPattern, PatternElement};
use crate::plan::{BoundMask, IndexKind, UNPLANNABLE};
use crate::statistics::Statistics;
use crate::symbol::Symbol;
use std::collections::HashSet;

/// Compute the bound mask for `pattern` given the set of already-resolved
/// symbols.
pub fn bound_mask(pattern: &DataPattern, resolved: &HashSet<Symbol>) -> BoundMask {
    let bound = |e: &PatternElement| e.is_bound(resolved);
    BoundMask {
        e: bound(&pattern.e),
        a: bound(&pattern.a),
        v: bound(&pattern.v),
        t: pattern.t.as_ref().map(bound).unwrap_or(false),
    }
}

/// Selectivity score under `resolved` (§4.2). Lower is better; `UNPLANNABLE`
/// defers the pattern when nothing about it is bound yet but other symbols
/// are already resolved.
pub fn score_pattern(
    pattern: &DataPattern,
    resolved: &HashSet<Symbol>,
    stats: &dyn Statistics,
) -> i64 {
    let mask = bound_mask(pattern, resolved);
    if !mask.any() && !resolved.is_empty() {
        return UNPLANNABLE;
    }

    let mut score: i64 = 0;

    score += match &pattern.e {
        PatternElement::Constant(_) => -800,
        PatternElement::Variable(s) if resolved.contains(s) => 0,
        PatternElement::Variable(_) | PatternElement::Blank => 1000,
    };

    score += match &pattern.a {
        PatternElement::Constant(v) => {
            let baseline = 0i64;
            let cardinality_penalty = v
                .as_attribute()
                .and_then(|attr| stats.attribute_cardinality(attr))
                .map(|c| (c / 100) as i64)
                .unwrap_or(0);
            baseline + cardinality_penalty
        }
        PatternElement::Variable(s) if resolved.contains(s) => 10,
        PatternElement::Variable(_) | PatternElement::Blank => 100,
    };

    score += match &pattern.v {
        PatternElement::Constant(_) => -500,
        PatternElement::Variable(s) if resolved.contains(s) => -500,
        PatternElement::Variable(_) | PatternElement::Blank => 500,
    };

    let new_vars = pattern
        .elements()
        .filter_map(|e| e.as_variable())
        .filter(|s| !resolved.contains(*s))
        .count() as i64;
    score -= 10 * new_vars;

    score
}

/// Select the physical index for a bound mask (§4.2 table: E∧A∧V→EAVT,
/// E∧A→EAVT, A∧V→AVET, A∧E→AEVT, E→EAVT, A→AEVT, V→VAET, none→EAVT). The
/// table's "E∧A" and "A∧E" rows denote the same boolean condition with
/// different chosen indexes; since both bound-elements are known the moment
/// either holds, "E∧A" (checked first, per table order) takes precedence
/// and "A∧E" never independently fires — it is listed here only for
/// traceability against the spec text.
pub fn select_index(mask: BoundMask) -> IndexKind {
    match (mask.e, mask.a, mask.v) {
        (true, true, _) => IndexKind::Eavt, // E∧A∧V and E∧A
        (false, true, true) => IndexKind::Avet,
        (true, false, false) => IndexKind::Eavt,
        (false, true, false) => IndexKind::Aevt,
        (false, false, true) => IndexKind::Vaet,
        (false, false, false) => IndexKind::Eavt,
    }
}

/// Variables this pattern will bind given what's already resolved (used to
/// compute `PatternPlan::binds` and to extend `resolved` as patterns are
/// scheduled).
pub fn bound_variables(pattern: &DataPattern, resolved: &HashSet<Symbol>) -> Vec<Symbol> {
    pattern
        .elements()
        .filter_map(|e| e.as_variable())
        .filter(|s| !resolved.contains(*s))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::statistics::NoStatistics;

    fn pattern_of(q: &crate::ast::Query, i: usize) -> &DataPattern {
        match &q.where_clauses[i] {
            crate::ast::Clause::DataPattern(p) => p,
            _ => panic!("expected pattern"),
        }
    }

    #[test]
    fn fully_unbound_pattern_scores_high() {
        let q = QueryBuilder::new().pattern("?e", "?a", "?v").build();
        let resolved = HashSet::new();
        let score = score_pattern(pattern_of(&q, 0), &resolved, &NoStatistics);
        assert!(score > 0);
    }

    #[test]
    fn constant_attribute_is_selective() {
        let q = QueryBuilder::new().pattern("?e", ":person/name", "?v").build();
        let resolved = HashSet::new();
        let score = score_pattern(pattern_of(&q, 0), &resolved, &NoStatistics);
        assert!(score < 0);
    }

    #[test]
    fn unplannable_when_fully_unbound_but_others_resolved() {
        let q = QueryBuilder::new().pattern("?e", "?a", "?v").build();
        let mut resolved = HashSet::new();
        resolved.insert(Symbol::new("?unrelated"));
        let score = score_pattern(pattern_of(&q, 0), &resolved, &NoStatistics);
        assert_eq!(score, UNPLANNABLE);
    }

    #[test]
    fn index_selection_table() {
        assert_eq!(
            select_index(BoundMask { e: true, a: true, v: true, t: false }),
            IndexKind::Eavt
        );
        assert_eq!(
            select_index(BoundMask { e: false, a: true, v: true, t: false }),
            IndexKind::Avet
        );
        assert_eq!(
            select_index(BoundMask { e: false, a: true, v: false, t: false }),
            IndexKind::Aevt
        );
        assert_eq!(
            select_index(BoundMask { e: false, a: false, v: true, t: false }),
            IndexKind::Vaet
        );
        assert_eq!(
            select_index(BoundMask { e: false, a: false, v: false, t: false }),
            IndexKind::Eavt
        );
    }
}
