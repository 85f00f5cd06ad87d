//! # Validation (§4.12)
//!
//! Runs once phases reach final order and symbol sets are recomputed.
//! Checks every `:find` variable is reachable and every `FunctionPredicate`
//! names a registered function at the right arity.

use crate::ast::{Clause, Query};
use crate::error::{PlanError, PlanResult};
use crate::plan::Phase;
use crate::registry::FunctionRegistry;
use crate::symbol::Symbol;
use std::collections::HashSet;

fn all_provided_symbols(phases: &[Phase]) -> HashSet<Symbol> {
    let mut out = HashSet::new();
    for phase in phases {
        out.extend(phase.provides.iter().cloned());
        out.extend(phase.expressions.iter().map(|e| e.binding.clone()));
        for group in &phase.decorrelated_subqueries {
            for member in &group.members {
                out.extend(member.grouping_symbols.iter().cloned());
                out.extend(member.aggregate_symbols.iter().cloned());
            }
        }
        for ca in &phase.metadata.conditional_aggregates {
            out.insert(ca.binding.clone());
        }
    }
    out
}

fn check_find_reachable(query: &Query, phases: &[Phase], input_symbols: &[Symbol]) -> PlanResult<()> {
    let base: HashSet<Symbol> = input_symbols.iter().cloned().collect();
    let provided = all_provided_symbols(phases);
    for f in &query.find {
        let sym = f.symbol();
        if !base.contains(sym) && !provided.contains(sym) {
            return Err(PlanError::UnboundFindVariable(sym.clone()));
        }
    }
    Ok(())
}

fn check_function_predicate(name: &str, args_len: usize, registry: &FunctionRegistry) -> PlanResult<()> {
    match registry.lookup(name) {
        None => Err(PlanError::UnknownFunction(name.to_string())),
        Some(spec) if spec.arity != args_len => Err(PlanError::WrongArity {
            name: name.to_string(),
            expected: spec.arity,
            got: args_len,
        }),
        Some(_) => Ok(()),
    }
}

fn check_functions(phases: &[Phase], registry: &FunctionRegistry) -> PlanResult<()> {
    for phase in phases {
        for pred in phase.predicates.iter().chain(phase.join_predicates.iter()) {
            if let Clause::FunctionPredicate(fp) = &pred.clause {
                check_function_predicate(&fp.name, fp.args.len(), registry)?;
            }
        }
    }
    Ok(())
}

/// Validate a final-order, symbol-set-complete phase sequence (§4.12).
pub fn validate(
    query: &Query,
    phases: &[Phase],
    input_symbols: &[Symbol],
    registry: &FunctionRegistry,
) -> PlanResult<()> {
    check_find_reachable(query, phases, input_symbols)?;
    check_functions(phases, registry)?;
    Ok(())
}
