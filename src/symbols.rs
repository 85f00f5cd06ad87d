//! # Keep/Available/Provides recomputation (§4.11)
//!
//! Run once after phases reach their final order (§4.10), and reused as a
//! building block by the assignment passes that need a phase's *current*
//! provides before the global recompute has happened.

use crate::ast::Query;
use crate::plan::Phase;
use crate::symbol::Symbol;
use std::collections::HashSet;

/// `provides` from a phase's patterns, expressions, and subqueries — used
/// both by the final §4.11 recompute and, in a restricted form, by the
/// re-entrant assignment passes (§4.4-§4.6) that need to reset `provides`
/// before re-placing their own clause kind.
///
/// Deviation from the literal spec text noted in `DESIGN.md`: §4.11 says
/// provides should include "non-decorrelated subquery binding outputs,"
/// which read literally would make a decorrelated subquery's own binding
/// symbols unavailable to any later clause in the same phase. Since the
/// decorrelated group still produces those exact symbols (via the merged
/// query's result columns, §4.9 "Result mapping"), this implementation
/// includes every subquery's binding symbols regardless of
/// `decorrelated`, which keeps invariants 1-2 (§3) satisfiable.
pub fn pattern_and_subquery_provides(phase: &Phase) -> Vec<Symbol> {
    let mut out: Vec<Symbol> = phase
        .patterns
        .iter()
        .flat_map(|p| p.binds.iter().cloned())
        .collect();
    for s in &phase.subqueries {
        out.extend(s.clause.binding.symbols());
    }
    out
}

/// Adds expression outputs on top of [`pattern_and_subquery_provides`] —
/// the full provides set for a phase as it currently stands.
pub fn full_provides(phase: &Phase) -> Vec<Symbol> {
    let mut out = pattern_and_subquery_provides(phase);
    out.extend(phase.expressions.iter().map(|e| e.binding.clone()));
    out
}

fn entity_like(symbol: &Symbol) -> bool {
    let s = symbol.as_str();
    s.ends_with("id") || s.contains("entity") || s.ends_with('e') && s.len() <= 3
}

/// Recompute `available`/`provides`/`keep` for every phase in final order
/// (§4.11). `input_symbols` is the outer query's own `:in` value symbols
/// (database marker excluded).
pub fn recompute_symbol_sets(phases: &mut [Phase], query: &Query, input_symbols: &[Symbol]) {
    let find_vars: Vec<Symbol> = query.find.iter().map(|f| f.symbol().clone()).collect();

    // Step 1: provides.
    for phase in phases.iter_mut() {
        phase.provides = full_provides(phase);
    }

    // Step 2: available. Phase 0 = inputs; phase i>0 = inputs ∪ keep[i-1].
    // `keep` isn't known yet on first pass, so we seed it from provides and
    // refine below in a second loop once every phase's required-symbol set
    // is known.
    let mut available_sets: Vec<HashSet<Symbol>> = Vec::with_capacity(phases.len());
    {
        let mut prev_keep: HashSet<Symbol> = input_symbols.iter().cloned().collect();
        for phase in phases.iter_mut() {
            phase.available = prev_keep.iter().cloned().collect();
            available_sets.push(prev_keep.clone());
            // provisional keep for the next iteration's availability,
            // corrected to the real keep once step 3 runs and loops back.
            let provides_set: HashSet<Symbol> = phase.provides.iter().cloned().collect();
            prev_keep = prev_keep.union(&provides_set).cloned().collect();
        }
    }

    // Step 3: keep, computed with full knowledge of every phase's
    // requirements, then available is recomputed once more from the real
    // keep sets (this two-pass shape is what makes `available[i]` depend
    // only on `keep[i-1]`, never on a later phase's requirements).
    //
    // `running` folds in both `required_symbols` (clause-level requirers)
    // and `pattern_element_symbols` (join keys a later phase's patterns
    // merely reuse, without "requiring" them in the clause sense) — §4.11
    // step 3 needs both: a future phase's pattern can rebind a symbol this
    // phase already produced, and that symbol must survive in `keep` for
    // the join to actually happen instead of rescanning unconstrained.
    let required_by_future: Vec<HashSet<Symbol>> = {
        let mut acc = vec![HashSet::new(); phases.len()];
        let mut running: HashSet<Symbol> = HashSet::new();
        for i in (0..phases.len()).rev() {
            acc[i] = running.clone();
            running.extend(phases[i].required_symbols());
            running.extend(phases[i].pattern_element_symbols());
        }
        acc
    };

    let mut aggregate_columns: Vec<HashSet<Symbol>> = phases
        .iter()
        .map(|p| p.metadata.aggregate_required_columns.iter().cloned().collect())
        .collect();
    // A later phase's aggregate_required_columns can still need a symbol
    // available in an earlier phase (e.g. after the rewriter moves the
    // entry to "the latest phase that produces any such symbol" in §4.8's
    // post-fixup, earlier phases must still keep it).
    for i in 0..phases.len() {
        for j in (i + 1)..phases.len() {
            for s in aggregate_columns[j].clone() {
                aggregate_columns[i].insert(s);
            }
        }
    }

    let find_set: HashSet<Symbol> = find_vars.iter().cloned().collect();
    let mut keeps: Vec<HashSet<Symbol>> = Vec::with_capacity(phases.len());

    for (i, phase) in phases.iter().enumerate() {
        let available: HashSet<Symbol> = available_sets[i].clone();
        // A symbol this phase itself produces is just as keepable as one
        // handed in from an earlier phase — `available` alone (what's
        // resolved *before* phase i runs) would never let a phase keep its
        // own freshly-bound join keys for a later phase's pattern to reuse.
        let keepable: HashSet<Symbol> = available.union(&phase.provides.iter().cloned().collect()).cloned().collect();
        let mut keep: Vec<Symbol> = Vec::new();
        let mut keep_set: HashSet<Symbol> = HashSet::new();

        for v in &find_vars {
            if keepable.contains(v) && keep_set.insert(v.clone()) {
                keep.push(v.clone());
            }
        }

        let mut rest: Vec<Symbol> = required_by_future[i]
            .iter()
            .chain(aggregate_columns[i].iter())
            .filter(|s| keepable.contains(*s) && !keep_set.contains(*s))
            .cloned()
            .collect();
        rest.sort();
        for s in rest {
            if keep_set.insert(s.clone()) {
                keep.push(s);
            }
        }

        if i > 0 && !available.is_empty() && !keep.iter().any(|s| available.contains(s)) {
            let provides_set: HashSet<Symbol> = phase.provides.iter().cloned().collect();
            let mut candidate = available
                .intersection(&provides_set)
                .find(|s| entity_like(s))
                .or_else(|| available.intersection(&provides_set).next())
                .cloned();
            if candidate.is_none() {
                candidate = available.iter().next().cloned();
            }
            if let Some(s) = candidate {
                if keep_set.insert(s.clone()) {
                    keep.push(s);
                }
            }
        }

        keep_set.extend(keep.iter().cloned());
        keeps.push(keep_set);
        phase.keep = keep;
    }

    // Recompute `available` from the real `keep` sets.
    let mut prev_keep: HashSet<Symbol> = input_symbols.iter().cloned().collect();
    for (i, phase) in phases.iter_mut().enumerate() {
        phase.available = {
            let mut v: Vec<Symbol> = prev_keep.iter().cloned().collect();
            v.sort();
            v
        };
        prev_keep = prev_keep.union(&keeps[i]).cloned().collect();
    }

    if let Some(last) = phases.last_mut() {
        last.find = Some(query.find.clone());
    }
}
