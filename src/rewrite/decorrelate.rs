//! # Subquery decorrelation (§4.9)
//!
//! Merges grouped-aggregate subqueries that share a correlation signature
//! and filter structure into a single recursively-planned query, so the
//! executor runs it once instead of once per outer tuple.

use crate::analysis::clause_text;
use crate::ast::{Clause, DataPattern, FindElem, PatternElement, Query};
use crate::error::{PlanError, PlanResult};
use crate::options::PlannerOptions;
use crate::plan::{CorrelationSignature, DecorrelatedGroup, DecorrelatedMember, Phase, SubqueryPlan};
use crate::symbol::Symbol;
use std::collections::BTreeMap;

/// Pure aggregates are never decorrelated — merging would change which rows
/// each original subquery's aggregate is computed over (§4.9).
fn is_grouped_aggregate(query: &Query) -> bool {
    let has_agg = query.find.iter().any(FindElem::is_aggregate);
    let has_plain = query.find.iter().any(|f| !f.is_aggregate());
    has_agg && has_plain
}

fn correlation_signature(sq: &SubqueryPlan) -> Option<CorrelationSignature> {
    if !is_grouped_aggregate(&sq.clause.query) {
        return None;
    }
    Some(CorrelationSignature {
        correlation_vars: sq.clause.outer_symbols().cloned().collect(),
        is_grouped_aggregate: true,
    })
}

fn pattern_attribute(p: &DataPattern) -> Option<String> {
    match &p.a {
        PatternElement::Constant(v) => v.as_attribute().map(str::to_string),
        _ => None,
    }
}

/// Structural key for a nested query's `:where`, used both for filter-group
/// partitioning and (with `ignore_attributes`) for the optional CSE pass
/// (§4.9). Built from clause text rather than a canonicalizing serializer —
/// good enough to group subqueries whose filters really are identical.
fn filter_key(query: &Query, ignore_attributes: bool) -> String {
    let mut parts: Vec<String> = Vec::new();
    for clause in &query.where_clauses {
        match clause {
            Clause::DataPattern(p) => {
                if !ignore_attributes {
                    if let Some(a) = pattern_attribute(p) {
                        parts.push(format!("pat:{a}"));
                    }
                }
            }
            other => parts.push(clause_text(other)),
        }
    }
    parts.sort();
    parts.join("|")
}

fn build_merged_query(members: &[&SubqueryPlan], grouping_vars: &[Symbol]) -> Query {
    let mut find: Vec<FindElem> = grouping_vars.iter().cloned().map(FindElem::Variable).collect();
    for m in members {
        for f in &m.clause.query.find {
            if f.is_aggregate() {
                find.push(f.clone());
            }
        }
    }

    let mut where_clauses: Vec<Clause> = Vec::new();
    for m in members {
        for c in &m.clause.query.where_clauses {
            if !where_clauses.contains(c) {
                where_clauses.push(c.clone());
            }
        }
    }

    Query::new(find, vec![Symbol::new("$")], where_clauses)
}

fn decorrelate_phase(phase: &mut Phase, options: &PlannerOptions) -> PlanResult<bool> {
    let mut by_signature: BTreeMap<CorrelationSignature, Vec<usize>> = BTreeMap::new();
    for (i, sq) in phase.subqueries.iter().enumerate() {
        if sq.decorrelated {
            continue;
        }
        if let Some(sig) = correlation_signature(sq) {
            by_signature.entry(sig).or_default().push(i);
        }
    }

    let mut any = false;
    let mut new_groups: Vec<DecorrelatedGroup> = Vec::new();

    for (signature, indices) in by_signature {
        if indices.len() < 2 {
            continue;
        }

        let mut by_filter: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for i in indices {
            let key = filter_key(&phase.subqueries[i].clause.query, false);
            by_filter.entry(key).or_default().push(i);
        }

        let merged_groups: Vec<Vec<usize>> = if options.enable_cse {
            let mut by_cse: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for members in by_filter.into_values() {
                let cse_key = filter_key(&phase.subqueries[members[0]].clause.query, true);
                by_cse.entry(cse_key).or_default().extend(members);
            }
            by_cse.into_values().collect()
        } else {
            by_filter.into_values().collect()
        };

        for members in merged_groups {
            if members.len() < 2 {
                continue;
            }

            let grouping_vars: Vec<Symbol> =
                phase.subqueries[members[0]].clause.query.value_inputs().cloned().collect();
            let member_refs: Vec<&SubqueryPlan> = members.iter().map(|&i| &phase.subqueries[i]).collect();
            let merged = build_merged_query(&member_refs, &grouping_vars);

            let merged_plan = crate::planner::plan_with_bindings(&merged, &[], options)
                .map_err(|e| PlanError::NestedPlanError(Box::new(e)))?;

            let group_members: Vec<DecorrelatedMember> = members
                .iter()
                .map(|&i| {
                    let aggregate_symbols: Vec<Symbol> = phase.subqueries[i]
                        .clause
                        .query
                        .find
                        .iter()
                        .filter(|f| f.is_aggregate())
                        .map(|f| f.symbol().clone())
                        .collect();
                    DecorrelatedMember {
                        subquery_index: i,
                        grouping_symbols: grouping_vars.clone(),
                        aggregate_symbols,
                    }
                })
                .collect();

            for &i in &members {
                phase.subqueries[i].decorrelated = true;
            }

            new_groups.push(DecorrelatedGroup {
                signature: signature.clone(),
                merged_plan,
                members: group_members,
            });
            any = true;
        }
    }

    if !new_groups.is_empty() {
        tracing::debug!(
            groups_formed = new_groups.len(),
            subqueries_merged = new_groups.iter().map(|g| g.members.len()).sum::<usize>(),
            "decorrelation_phase_merged"
        );
    }

    phase.decorrelated_subqueries.extend(new_groups);
    Ok(any)
}

/// Run decorrelation over every phase (§4.9). Returns whether any group was
/// merged.
pub fn decorrelate_subqueries(phases: &mut [Phase], options: &PlannerOptions) -> PlanResult<bool> {
    let mut any = false;
    for (phase_index, phase) in phases.iter_mut().enumerate() {
        if decorrelate_phase(phase, options)? {
            any = true;
            tracing::debug!(phase_index, "decorrelation_applied");
        }
    }
    Ok(any)
}
