//! Planner error types.

use crate::symbol::Symbol;
use thiserror::Error;

/// Everything the planner can fail with (§6 "Errors", §7 Error Handling
/// Design). Validation failures are terminal for the plan call — they are
/// not retried at a different phase, and a failing plan is never cached
/// (enforced at the call site in [`crate::planner`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// A structurally malformed query (e.g. an empty `:find` clause) that
    /// the distilled spec assumes away but a real entry point must reject.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A `:find` variable is neither a query input nor provided by any
    /// phase (§4.12, §8 property 3).
    #[error("unbound find variable: {0}")]
    UnboundFindVariable(Symbol),

    /// A `FunctionPredicate` names a function absent from the registry.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A `FunctionPredicate` names a registered function but supplies the
    /// wrong number of arguments.
    #[error("function '{name}' expects {expected} args, got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// No phase can host this predicate given its required symbols (§4.5).
    #[error("cannot place predicate '{clause_text}': requires {required_symbols:?}")]
    UnplaceablePredicate {
        clause_text: String,
        required_symbols: Vec<Symbol>,
    },

    /// A nested subquery's own `plan()` call failed (§4.6).
    #[error("nested query planning failed: {0}")]
    NestedPlanError(Box<PlanError>),

    /// `PlannerOptions::max_phases` was exceeded.
    #[error("plan exceeds max_phases ({max}): produced {actual}")]
    TooManyPhases { max: usize, actual: usize },
}

pub type PlanResult<T> = Result<T, PlanError>;
