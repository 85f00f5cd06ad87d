//! # Clause symbol analysis (§4.1)
//!
//! For every [`Clause`] variant, computes the `requires`/`provides` symbol
//! sets the rest of the planner builds on: phase construction, expression and
//! predicate placement, the validator's reachability check, and the keep/
//! available/provides recomputation all go through [`clause_symbols`] rather
//! than re-deriving symbol sets ad hoc.
//!
//! This analysis is deliberately pure: it never looks at a `resolved` set or
//! any other execution-time state, so the same clause always yields the same
//! `(requires, provides)` pair regardless of where it appears. The one
//! context-sensitive case spec.md describes — promoting an `Eq` comparison
//! between an unbound variable and a constant into a binder — depends on
//! which symbols are already resolved in the surrounding phase, so it is
//! handled during predicate assignment (`crate::predicate_assign`) instead,
//! not here. See `DESIGN.md` Open Question 1.

use crate::ast::{Clause, ExprArg};
use crate::symbol::Symbol;

/// The symbols a clause must see bound before it can run, and the symbols it
/// newly binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseSymbols {
    pub requires: Vec<Symbol>,
    pub provides: Vec<Symbol>,
}

fn arg_symbol(arg: &ExprArg) -> Option<Symbol> {
    arg.as_var().cloned()
}

/// Compute `(requires, provides)` for a single clause (§4.1).
pub fn clause_symbols(clause: &Clause) -> ClauseSymbols {
    match clause {
        Clause::DataPattern(p) => ClauseSymbols {
            requires: Vec::new(),
            provides: p
                .elements()
                .filter_map(|e| e.as_variable().cloned())
                .collect(),
        },
        Clause::Expression(e) => ClauseSymbols {
            requires: e.args.iter().filter_map(arg_symbol).collect(),
            provides: vec![e.binding.clone()],
        },
        Clause::Comparison(c) => ClauseSymbols {
            requires: [&c.left, &c.right].into_iter().filter_map(arg_symbol).collect(),
            provides: Vec::new(),
        },
        Clause::ChainedComparison(c) => ClauseSymbols {
            requires: c.operands.iter().filter_map(arg_symbol).collect(),
            provides: Vec::new(),
        },
        Clause::NotEqualPredicate(p) => ClauseSymbols {
            requires: [&p.left, &p.right].into_iter().filter_map(arg_symbol).collect(),
            provides: Vec::new(),
        },
        Clause::GroundPredicate(g) => ClauseSymbols {
            requires: Vec::new(),
            provides: vec![g.binding.clone()],
        },
        Clause::MissingPredicate(m) => ClauseSymbols {
            requires: arg_symbol(&m.entity).into_iter().collect(),
            provides: Vec::new(),
        },
        Clause::FunctionPredicate(f) => ClauseSymbols {
            requires: f.args.iter().filter_map(arg_symbol).collect(),
            provides: Vec::new(),
        },
        Clause::SubqueryPattern(s) => ClauseSymbols {
            requires: s.outer_symbols().cloned().collect(),
            provides: s.binding.symbols(),
        },
    }
}

/// Textual rendering of a clause for error messages (§6
/// `UnplaceablePredicate`). Not a real pretty-printer — just enough to name
/// the offending clause in a diagnostic.
pub fn clause_text(clause: &Clause) -> String {
    match clause {
        Clause::DataPattern(p) => format!("{p:?}"),
        Clause::Expression(e) => format!("[({:?} ...) {}]", e.function, e.binding),
        Clause::Comparison(c) => format!("[({} {:?} {:?})]", c.op.symbol(), c.left, c.right),
        Clause::ChainedComparison(c) => format!("[({} {:?})]", c.op.symbol(), c.operands),
        Clause::NotEqualPredicate(p) => format!("[(not= {:?} {:?})]", p.left, p.right),
        Clause::GroundPredicate(g) => format!("[(ground {:?}) {}]", g.value, g.binding),
        Clause::MissingPredicate(m) => format!("[(missing? $ {:?} {:?})]", m.entity, m.attribute),
        Clause::FunctionPredicate(f) => format!("[({} {:?})]", f.name, f.args),
        Clause::SubqueryPattern(_) => "[(q ...) ...]".to_string(),
    }
}
