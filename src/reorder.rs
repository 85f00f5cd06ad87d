//! # Phase reorderer (§4.10)
//!
//! Greedy, dependency-respecting: at each step prefer an executable phase
//! that shares symbols with what's already resolved, scored by how much it
//! shares, falling back to the first executable-but-unrelated phase, and
//! finally to the first remaining phase at all (tolerates malformed plans
//! rather than panicking).

use crate::plan::Phase;
use crate::symbol::Symbol;
use std::collections::HashSet;

fn phase_required(phase: &Phase) -> HashSet<Symbol> {
    phase.required_symbols().into_iter().collect()
}

fn phase_provides(phase: &Phase) -> HashSet<Symbol> {
    let mut out: HashSet<Symbol> = phase.provides.iter().cloned().collect();
    out.extend(phase.expressions.iter().map(|e| e.binding.clone()));
    out
}

/// Reorder phases into a dependency-respecting execution order (§4.10).
/// Consumes the phase list since reordering moves phases to new positions;
/// callers must follow up with [`crate::symbols::recompute_symbol_sets`]
/// (§4.11) since `available`/`provides`/`keep` depend on final order.
pub fn reorder_phases(phases: Vec<Phase>, input_symbols: &[Symbol]) -> Vec<Phase> {
    let mut remaining: Vec<Phase> = phases;
    let phase_count = remaining.len();
    let mut ordered: Vec<Phase> = Vec::with_capacity(remaining.len());
    let mut resolved: HashSet<Symbol> = input_symbols.iter().cloned().collect();

    while !remaining.is_empty() {
        let executable: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, p)| phase_required(p).is_subset(&resolved))
            .map(|(i, _)| i)
            .collect();

        let chosen = if executable.is_empty() {
            0
        } else {
            let mut related: Vec<usize> = Vec::new();
            let mut unrelated: Vec<usize> = Vec::new();
            for &i in &executable {
                if phase_required(&remaining[i]).intersection(&resolved).next().is_some() {
                    related.push(i);
                } else {
                    unrelated.push(i);
                }
            }

            if !related.is_empty() {
                let mut best = related[0];
                let mut best_score = -1i64;
                for &i in &related {
                    let req = phase_required(&remaining[i]);
                    let intersection_count = req.intersection(&resolved).count() as i64;
                    let bound_intersections =
                        phase_provides(&remaining[i]).intersection(&resolved).count() as i64;
                    let score = intersection_count + bound_intersections;
                    if score > best_score {
                        best_score = score;
                        best = i;
                    }
                }
                best
            } else {
                unrelated[0]
            }
        };

        let phase = remaining.remove(chosen);
        resolved.extend(phase_provides(&phase));
        tracing::trace!(phase_index = ordered.len(), resolved_count = resolved.len(), "reorder_phase_placed");
        ordered.push(phase);
    }

    tracing::debug!(phase_count, "reorder_complete");
    ordered
}
