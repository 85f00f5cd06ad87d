//! # Predicate assignment (§4.5)

use crate::analysis::{clause_symbols, clause_text};
use crate::ast::{Clause, Comparison, CompareOp, ExprArg};
use crate::ast::Query;
use crate::error::{PlanError, PlanResult};
use crate::plan::{Phase, PredicateClass, PredicatePlan};
use crate::symbol::Symbol;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

fn extract_var_const(comparison: &Comparison) -> Option<(Symbol, Value)> {
    match (&comparison.left, &comparison.right) {
        (ExprArg::Var(v), ExprArg::Const(c)) => Some((v.clone(), c.clone())),
        (ExprArg::Const(c), ExprArg::Var(v)) => Some((v.clone(), c.clone())),
        _ => None,
    }
}

/// Classify a predicate clause into a [`PredicatePlan`], without deciding
/// placement (§3 Data Model).
pub fn classify_predicate(clause: &Clause) -> PredicatePlan {
    let required_vars = clause_symbols(clause).requires;
    match clause {
        Clause::Comparison(c) => {
            let class = if c.op == CompareOp::Eq {
                PredicateClass::Equality
            } else {
                PredicateClass::Comparison
            };
            let (variable, value) = extract_var_const(c).map_or((None, None), |(v, c)| (Some(v), Some(c)));
            PredicatePlan {
                clause: clause.clone(),
                class,
                variable,
                value,
                operator: Some(c.op),
                required_vars,
            }
        }
        Clause::ChainedComparison(c) => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::ChainedComparison,
            variable: None,
            value: None,
            operator: Some(c.op),
            required_vars,
        },
        Clause::NotEqualPredicate(_) => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::NotEqual,
            variable: None,
            value: None,
            operator: None,
            required_vars,
        },
        Clause::GroundPredicate(g) => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::Ground,
            variable: Some(g.binding.clone()),
            value: Some(g.value.clone()),
            operator: None,
            required_vars,
        },
        Clause::MissingPredicate(m) => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::Missing,
            variable: m.entity.as_var().cloned(),
            value: Some(m.attribute.clone()),
            operator: None,
            required_vars,
        },
        Clause::FunctionPredicate(_) => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::Function,
            variable: None,
            value: None,
            operator: None,
            required_vars,
        },
        _ => PredicatePlan {
            clause: clause.clone(),
            class: PredicateClass::Unknown,
            variable: None,
            value: None,
            operator: None,
            required_vars,
        },
    }
}

/// Which symbol this predicate would bind if treated as a ground binder:
/// only an `Eq` `Comparison` between exactly one variable and one constant
/// qualifies (§4.1, §4.5).
fn ground_candidate(plan: &PredicatePlan) -> Option<Symbol> {
    if plan.class == PredicateClass::Equality {
        if let (Clause::Comparison(c), Some(var)) = (&plan.clause, &plan.variable) {
            if extract_var_const(c).is_some() {
                return Some(var.clone());
            }
        }
    }
    None
}

/// First phase index that newly introduces `symbol` (via a pattern,
/// expression, or subquery binding), for join-predicate detection.
fn provider_phases(phases: &[Phase]) -> HashMap<Symbol, usize> {
    let mut map = HashMap::new();
    for (i, phase) in phases.iter().enumerate() {
        for s in crate::symbols::pattern_and_subquery_provides(phase) {
            map.entry(s).or_insert(i);
        }
        for e in &phase.expressions {
            map.entry(e.binding.clone()).or_insert(i);
        }
    }
    map
}

/// Place every predicate clause in the earliest valid phase (§4.5).
/// Re-entrant like [`crate::expr_assign::assign_expressions`].
pub fn assign_predicates(
    phases: &mut [Phase],
    query: &Query,
    input_symbols: &[Symbol],
) -> PlanResult<()> {
    for phase in phases.iter_mut() {
        phase.predicates.clear();
        phase.join_predicates.clear();
    }

    if phases.is_empty() {
        return Ok(());
    }

    let expr_phase_of: HashMap<Symbol, usize> = phases
        .iter()
        .enumerate()
        .flat_map(|(i, p)| p.expressions.iter().map(move |e| (e.binding.clone(), i)))
        .collect();

    let provider_phase = provider_phases(phases);

    let predicate_clauses: Vec<Clause> = query
        .where_clauses
        .iter()
        .filter(|c| c.is_predicate())
        .cloned()
        .collect();

    let base: HashSet<Symbol> = input_symbols.iter().cloned().collect();

    for clause in predicate_clauses {
        let mut plan = classify_predicate(&clause);

        if let Some(var) = ground_candidate(&plan) {
            if let Some(&expr_phase) = expr_phase_of.get(&var) {
                phases[expr_phase].predicates.push(plan);
                continue;
            }
            // Only an otherwise-unresolved variable gets promoted; one
            // already bound by a pattern is an ordinary filter (§4.5).
            if !provider_phase.contains_key(&var) && !base.contains(&var) {
                plan.class = PredicateClass::Ground;
                phases[0].provides.push(var);
                phases[0].predicates.push(plan);
                continue;
            }
        }

        let mut cumulative = base.clone();
        let mut placed = false;

        for i in 0..phases.len() {
            let provides_now: HashSet<Symbol> = phases[i].provides.iter().cloned().collect();
            let visible: HashSet<Symbol> = cumulative.union(&provides_now).cloned().collect();

            if plan.required_vars.iter().all(|s| visible.contains(s)) {
                let is_join_predicate = plan.class == PredicateClass::Equality && {
                    if let Clause::Comparison(c) = &plan.clause {
                        matches!(
                            (c.left.as_var(), c.right.as_var()),
                            (Some(_), Some(_))
                        ) && {
                            let l = c.left.as_var().unwrap();
                            let r = c.right.as_var().unwrap();
                            match (provider_phase.get(l), provider_phase.get(r)) {
                                (Some(&lp), Some(&rp)) => lp != rp && (lp == i || rp == i),
                                _ => false,
                            }
                        }
                    } else {
                        false
                    }
                };

                if is_join_predicate {
                    phases[i].join_predicates.push(plan.clone());
                } else {
                    phases[i].predicates.push(plan.clone());
                }
                placed = true;
                break;
            }
            cumulative.extend(provides_now);
        }

        if !placed {
            return Err(PlanError::UnplaceablePredicate {
                clause_text: clause_text(&clause),
                required_symbols: plan.required_vars,
            });
        }
    }

    Ok(())
}
