//! # Predicate pushdown (§4.7)

use crate::ast::{Clause, ExprArg, ExprFunction, TimeField};
use crate::options::PlannerOptions;
use crate::plan::{Phase, PredicateClass, PredicatePlan, StorageConstraint};
use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};

fn is_time_attribute(attribute: &str, options: &PlannerOptions) -> bool {
    options.time_attributes.contains(attribute)
}

/// Rewrites `time_field(input) -> output` expressions paired with an
/// `output op constant` predicate into a single `TimeExtraction`
/// `PredicatePlan`. The expression itself is left in place.
fn compose_time_extraction(phase: &mut Phase) {
    let extracts: HashMap<Symbol, (TimeField, Symbol)> = phase
        .expressions
        .iter()
        .filter_map(|e| match &e.function {
            ExprFunction::TimeExtract(field) => {
                let input = e.args.first()?.as_var()?.clone();
                Some((e.binding.clone(), (*field, input)))
            }
            _ => None,
        })
        .collect();

    if extracts.is_empty() {
        return;
    }

    let mut replacements: Vec<(usize, PredicatePlan)> = Vec::new();

    for (i, pred) in phase.predicates.iter().enumerate() {
        let Clause::Comparison(c) = &pred.clause else {
            continue;
        };
        let var_const = match (&c.left, &c.right) {
            (ExprArg::Var(v), ExprArg::Const(val)) => Some((v.clone(), val.clone())),
            (ExprArg::Const(val), ExprArg::Var(v)) => Some((v.clone(), val.clone())),
            _ => None,
        };
        let Some((output, value)) = var_const else {
            continue;
        };
        if let Some((_, input)) = extracts.get(&output) {
            replacements.push((
                i,
                PredicatePlan {
                    clause: pred.clause.clone(),
                    class: PredicateClass::TimeExtraction,
                    variable: Some(input.clone()),
                    value: Some(value),
                    operator: Some(c.op),
                    required_vars: vec![input.clone()],
                },
            ));
        }
    }

    for (i, replacement) in replacements {
        phase.predicates[i] = replacement;
    }
}

fn time_extract_info(phase: &Phase, input: &Symbol) -> Option<(TimeField, Symbol)> {
    phase.expressions.iter().find_map(|e| match &e.function {
        ExprFunction::TimeExtract(field) if e.args.first().and_then(ExprArg::as_var) == Some(input) => {
            Some((*field, e.binding.clone()))
        }
        _ => None,
    })
}

/// Groups patterns by entity symbol and converts each eligible predicate
/// whose main variable is a group pattern's value-position variable into a
/// `StorageConstraint` attached to that pattern; the predicate is then
/// removed from the phase's predicate list.
fn attach_storage_constraints(phase: &mut Phase, options: &PlannerOptions) {
    let mut groups: HashMap<Symbol, Vec<usize>> = HashMap::new();
    for (i, p) in phase.patterns.iter().enumerate() {
        if let Some(e) = p.entity_symbol() {
            groups.entry(e.clone()).or_default().push(i);
        }
    }

    let mut attach: Vec<(usize, StorageConstraint)> = Vec::new();
    let mut remove: HashSet<usize> = HashSet::new();

    for pattern_indices in groups.values() {
        for (pred_idx, pred) in phase.predicates.iter().enumerate() {
            if remove.contains(&pred_idx) {
                continue;
            }
            let Some(var) = pred.variable.clone() else {
                continue;
            };

            for &pi in pattern_indices {
                if phase.patterns[pi].value_symbol() != Some(&var) {
                    continue;
                }
                let Some(attribute) = phase.patterns[pi].attribute_name().map(str::to_string) else {
                    continue;
                };

                let constraint = match pred.class {
                    PredicateClass::Equality => pred
                        .value
                        .clone()
                        .map(|value| StorageConstraint::Equality { attribute: attribute.clone(), value }),
                    PredicateClass::Comparison => match (pred.operator, pred.value.clone()) {
                        (Some(op), Some(value)) => {
                            Some(StorageConstraint::Range { attribute: attribute.clone(), op, value })
                        }
                        _ => None,
                    },
                    PredicateClass::TimeExtraction if is_time_attribute(&attribute, options) => {
                        time_extract_info(phase, &var).and_then(|(field, extracted_symbol)| {
                            match (pred.operator, pred.value.clone()) {
                                (Some(op), Some(value)) => Some(StorageConstraint::TimeExtraction {
                                    attribute: attribute.clone(),
                                    field,
                                    op,
                                    value,
                                    extracted_symbol,
                                }),
                                _ => None,
                            }
                        })
                    }
                    _ => None,
                };

                if let Some(c) = constraint {
                    attach.push((pi, c));
                    remove.insert(pred_idx);
                    break;
                }
            }
        }
    }

    for (pi, c) in attach {
        phase.patterns[pi].constraints.push(c);
    }

    if !remove.is_empty() {
        let mut idx = 0usize;
        phase.predicates.retain(|_| {
            let keep = !remove.contains(&idx);
            idx += 1;
            keep
        });
    }
}

/// Run pushdown over every phase, in place (§4.7). No-op unless
/// `options.predicate_pushdown` is set.
pub fn pushdown(phases: &mut [Phase], options: &PlannerOptions) {
    if !options.predicate_pushdown {
        tracing::trace!("pushdown_skipped");
        return;
    }
    for (phase_index, phase) in phases.iter_mut().enumerate() {
        let before = phase.predicates.len();
        compose_time_extraction(phase);
        attach_storage_constraints(phase, options);
        tracing::debug!(
            phase_index,
            predicates_before = before,
            predicates_after = phase.predicates.len(),
            constraints_attached = phase.patterns.iter().map(|p| p.constraints.len()).sum::<usize>(),
            "pushdown_applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::QueryBuilder;
    use crate::expr_assign::assign_expressions;
    use crate::phase_builder::build_phases;
    use crate::predicate_assign::assign_predicates;

    #[test]
    fn equality_predicate_becomes_storage_constraint() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .pattern("?e", ":person/age", "?a")
            .eq("?a", 30)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        // the eq-as-binder promotion in predicate_assign only fires for
        // unbound variables; ?a is bound by the pattern, so this stays a
        // genuine Equality filter predicate eligible for pushdown.
        let opts = PlannerOptions::default();
        pushdown(&mut phases, &opts);
        assert_eq!(phases[0].patterns[0].constraints.len(), 1);
        assert!(phases[0].predicates.is_empty());
    }

    #[test]
    fn time_extraction_composes_and_attaches() {
        let q = QueryBuilder::new()
            .find_var("?b")
            .pattern("?b", ":price/time", "?t")
            .time_extract(TimeField::Day, "?t", "?d")
            .eq("?d", 20)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        let opts = PlannerOptions::default();
        pushdown(&mut phases, &opts);
        assert_eq!(phases[0].patterns[0].constraints.len(), 1);
        assert!(matches!(
            phases[0].patterns[0].constraints[0],
            StorageConstraint::TimeExtraction { .. }
        ));
    }

    #[test]
    fn pushdown_disabled_leaves_predicates_untouched() {
        let q = QueryBuilder::new()
            .find_var("?e")
            .pattern("?e", ":person/age", "?a")
            .eq("?a", 30)
            .build();
        let mut phases = build_phases(&q, &PlannerOptions::default());
        assign_expressions(&mut phases, &q, &[]);
        assign_predicates(&mut phases, &q, &[]).unwrap();
        let mut opts = PlannerOptions::default();
        opts.predicate_pushdown = false;
        pushdown(&mut phases, &opts);
        assert!(phases[0].patterns[0].constraints.is_empty());
        assert_eq!(phases[0].predicates.len(), 1);
    }
}
