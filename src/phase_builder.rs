//! # Phase builder (§4.3)
//!
//! Groups `DataPattern` clauses into phase candidates and orders them. Two
//! strategies, selected by [`crate::options::PlannerOptions::fine_grained_phases`]:
//! the default entity-grouped builder, and the fine-grained builder that
//! avoids Cartesian products between unrelated pattern groups (§8 S2).
//!
//! Expressions, predicates, and subqueries are *not* placed here — that's
//! [`crate::expr_assign`], [`crate::predicate_assign`], and
//! [`crate::subquery_assign`] respectively, run after phases exist.

use crate::ast::{Clause, DataPattern, PatternElement, Query};
use crate::options::PlannerOptions;
use crate::plan::{Phase, PatternPlan};
use crate::scoring::{bound_mask, bound_variables, score_pattern, select_index};
use crate::statistics::Statistics;
use crate::symbol::Symbol;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

#[derive(Clone, PartialEq, Eq, Hash)]
enum EntityKey {
    Var(Symbol),
    Const(Value),
    Unique(usize),
}

fn entity_key(pattern: &DataPattern, idx: usize) -> EntityKey {
    match &pattern.e {
        PatternElement::Variable(s) => EntityKey::Var(s.clone()),
        PatternElement::Constant(v) => EntityKey::Const(v.clone()),
        PatternElement::Blank => EntityKey::Unique(idx),
    }
}

fn group_symbols(group: &[usize], patterns: &[DataPattern]) -> HashSet<Symbol> {
    group
        .iter()
        .flat_map(|&i| patterns[i].elements().filter_map(|e| e.as_variable().cloned()))
        .collect()
}

fn find_symbols(query: &Query) -> HashSet<Symbol> {
    query.find.iter().map(|f| f.symbol().clone()).collect()
}

/// Group-by-entity-symbol, in first-seen order (§4.3 "Group patterns by
/// their entity-position symbol").
fn entity_grouped(patterns: &[DataPattern]) -> Vec<Vec<usize>> {
    let mut order: Vec<EntityKey> = Vec::new();
    let mut groups: HashMap<EntityKey, Vec<usize>> = HashMap::new();
    for (i, p) in patterns.iter().enumerate() {
        let key = entity_key(p, i);
        groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Vec::new()
        });
        groups.get_mut(&key).unwrap().push(i);
    }
    order.into_iter().map(|k| groups.remove(&k).unwrap()).collect()
}

/// The group-level selectivity used to pick the very first group: the most
/// selective pattern it contains (§4.2 scoring applied under the empty
/// `resolved` set).
fn group_min_score(group: &[usize], patterns: &[DataPattern], stats: &dyn Statistics) -> i64 {
    let empty = HashSet::new();
    group
        .iter()
        .map(|&i| score_pattern(&patterns[i], &empty, stats))
        .min()
        .unwrap_or(i64::MAX)
}

/// Greedy group ordering (§4.3): first by lowest selectivity score under
/// the empty `resolved` set, then by largest symbol overlap with the
/// running `resolved` set, tie-broken by whether the group touches a find
/// variable.
fn order_groups(
    mut groups: Vec<Vec<usize>>,
    patterns: &[DataPattern],
    find_vars: &HashSet<Symbol>,
    stats: &dyn Statistics,
) -> Vec<Vec<usize>> {
    let mut resolved: HashSet<Symbol> = HashSet::new();
    let mut ordered = Vec::new();

    if groups.is_empty() {
        return ordered;
    }

    let first_idx = groups
        .iter()
        .enumerate()
        .min_by_key(|(_, g)| group_min_score(g, patterns, stats))
        .map(|(i, _)| i)
        .unwrap();
    let first = groups.remove(first_idx);
    resolved.extend(group_symbols(&first, patterns));
    ordered.push(first);

    while !groups.is_empty() {
        let next_idx = groups
            .iter()
            .enumerate()
            .max_by_key(|(_, g)| {
                let symbols = group_symbols(g, patterns);
                let shared = symbols.intersection(&resolved).count();
                let has_find = symbols.iter().any(|s| find_vars.contains(s));
                (shared, has_find)
            })
            .map(|(i, _)| i)
            .unwrap();
        let next = groups.remove(next_idx);
        resolved.extend(group_symbols(&next, patterns));
        ordered.push(next);
    }

    ordered
}

/// Fine-grained builder (§4.3 "Fine-grained"): selective patterns first,
/// one phase per not-yet-processed entity, then entity-grouping on the
/// remainder.
fn fine_grained_groups(patterns: &[DataPattern], stats: &dyn Statistics) -> Vec<Vec<usize>> {
    let mut selective: Vec<usize> = (0..patterns.len())
        .filter(|&i| patterns[i].elements().any(PatternElement::is_constant))
        .collect();
    let empty = HashSet::new();
    selective.sort_by_key(|&i| score_pattern(&patterns[i], &empty, stats));

    let mut processed_entities: HashSet<Symbol> = HashSet::new();
    let mut used: HashSet<usize> = HashSet::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for i in selective {
        if used.contains(&i) {
            continue;
        }
        let entity_sym = patterns[i].e.as_variable().cloned();
        if let Some(sym) = &entity_sym {
            if processed_entities.contains(sym) {
                continue;
            }
        }

        let mut group = vec![i];
        used.insert(i);
        if let Some(sym) = &entity_sym {
            for (j, p) in patterns.iter().enumerate() {
                if used.contains(&j) {
                    continue;
                }
                if p.e.as_variable() == Some(sym) {
                    group.push(j);
                    used.insert(j);
                }
            }
            processed_entities.insert(sym.clone());
        }
        groups.push(group);
    }

    let remainder: Vec<usize> = (0..patterns.len()).filter(|i| !used.contains(i)).collect();
    if !remainder.is_empty() {
        let remainder_patterns: Vec<DataPattern> =
            remainder.iter().map(|&i| patterns[i].clone()).collect();
        for local_group in entity_grouped(&remainder_patterns) {
            groups.push(local_group.into_iter().map(|local_i| remainder[local_i]).collect());
        }
    }

    groups
}

/// Lower a group of pattern indices into a [`Phase`], scoring/indexing each
/// pattern against the symbols already bound by earlier patterns *within
/// this phase* (patterns kept in their original declaration order).
fn group_to_phase(mut group: Vec<usize>, patterns: &[DataPattern], stats: &dyn Statistics) -> Phase {
    group.sort_unstable();
    let mut resolved: HashSet<Symbol> = HashSet::new();
    let mut plans = Vec::with_capacity(group.len());

    for i in group {
        let pattern = patterns[i].clone();
        let mask = bound_mask(&pattern, &resolved);
        let selectivity = score_pattern(&pattern, &resolved, stats);
        let index = select_index(mask);
        let binds = bound_variables(&pattern, &resolved);
        resolved.extend(binds.iter().cloned());

        plans.push(PatternPlan {
            pattern,
            index,
            bound: mask,
            selectivity,
            binds,
            constraints: Vec::new(),
        });
    }

    let provides: Vec<Symbol> = plans.iter().flat_map(|p| p.binds.iter().cloned()).collect();
    Phase {
        patterns: plans,
        provides,
        ..Phase::default()
    }
}

fn query_has_non_pattern_clauses(query: &Query) -> bool {
    query
        .where_clauses
        .iter()
        .any(|c| !matches!(c, Clause::DataPattern(_)))
}

/// Build initial phase candidates from `query`'s `DataPattern` clauses.
pub fn build_phases(query: &Query, options: &PlannerOptions) -> Vec<Phase> {
    let patterns: Vec<DataPattern> = query
        .where_clauses
        .iter()
        .filter_map(|c| match c {
            Clause::DataPattern(p) => Some(p.clone()),
            _ => None,
        })
        .collect();

    let stats = options.statistics.as_ref();
    let find_vars = find_symbols(query);

    let groups = if patterns.is_empty() {
        Vec::new()
    } else if options.fine_grained_phases {
        fine_grained_groups(&patterns, stats)
    } else {
        order_groups(entity_grouped(&patterns), &patterns, &find_vars, stats)
    };

    let mut phases: Vec<Phase> = groups
        .into_iter()
        .map(|g| group_to_phase(g, &patterns, stats))
        .collect();

    if phases.is_empty() && query_has_non_pattern_clauses(query) {
        phases.push(Phase::default());
    }

    tracing::debug!(
        phase_count = phases.len(),
        clause_count = query.where_clauses.len(),
        fine_grained = options.fine_grained_phases,
        "phase_construction_complete"
    );

    phases
}
