//! Builder patterns for AST construction
//!
//! Fluent APIs for constructing `Query` trees without a text parser — used
//! by tests and by callers that already have a desugared query in hand.
//!
//! ## Example
//!
//! ```rust
//! use dlplanner::ast::builders::QueryBuilder;
//! use dlplanner::ast::FindElem;
//! use dlplanner::symbol::Symbol;
//!
//! // [:find ?e ?n :where [?e :person/name ?n] [(> ?e 100)]]
//! let query = QueryBuilder::new()
//!     .find_var("?e")
//!     .find_var("?n")
//!     .pattern("?e", ":person/name", "?n")
//!     .gt("?e", 100)
//!     .build();
//! assert_eq!(query.find.len(), 2);
//! ```

use super::{
    ArithOp, Clause, Comparison, CompareOp, DataPattern, Expression, ExprArg, ExprFunction,
    FindElem, GroundPredicate, NotEqualPredicate, PatternElement, Query, TimeField,
};
use crate::symbol::Symbol;
use crate::value::Value;

fn elem(text: &str) -> PatternElement {
    if let Some(var) = as_var(text) {
        PatternElement::Variable(var)
    } else if text == "_" {
        PatternElement::Blank
    } else {
        PatternElement::Constant(literal(text))
    }
}

fn as_var(text: &str) -> Option<Symbol> {
    text.starts_with('?').then(|| Symbol::new(text))
}

fn literal(text: &str) -> Value {
    if let Some(kw) = text.strip_prefix(':') {
        Value::keyword(format!(":{kw}"))
    } else if let Ok(i) = text.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = text.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::str(text)
    }
}

fn arg(text: &str) -> ExprArg {
    match as_var(text) {
        Some(v) => ExprArg::Var(v),
        None => ExprArg::Const(literal(text)),
    }
}

/// Builds a [`Query`] one clause at a time, inferring variables (`?`-prefixed
/// text) from constants the same way the teacher's `AtomBuilder` infers
/// variables from bare identifiers.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    find: Vec<FindElem>,
    inputs: Vec<Symbol>,
    where_clauses: Vec<Clause>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    pub fn find_var(mut self, name: &str) -> Self {
        self.find.push(FindElem::Variable(Symbol::new(name)));
        self
    }

    pub fn find_aggregate(mut self, func: super::AggregateFunc, arg: &str) -> Self {
        self.find.push(FindElem::Aggregate {
            func,
            arg: Symbol::new(arg),
        });
        self
    }

    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(Symbol::new(name));
        self
    }

    pub fn clause(mut self, clause: Clause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    /// `[e a v]`, inferring which positions are variables vs. constants from
    /// whether the text starts with `?`.
    pub fn pattern(mut self, e: &str, a: &str, v: &str) -> Self {
        self.where_clauses
            .push(Clause::DataPattern(DataPattern::new(
                elem(e),
                elem(a),
                elem(v),
            )));
        self
    }

    pub fn expr(mut self, function: ExprFunction, args: &[&str], binding: &str) -> Self {
        self.where_clauses.push(Clause::Expression(Expression {
            function,
            args: args.iter().map(|a| arg(a)).collect(),
            binding: Symbol::new(binding),
        }));
        self
    }

    pub fn time_extract(self, field: TimeField, input: &str, binding: &str) -> Self {
        self.expr(ExprFunction::TimeExtract(field), &[input], binding)
    }

    pub fn comparison(mut self, op: CompareOp, left: &str, right: &str) -> Self {
        self.where_clauses.push(Clause::Comparison(Comparison {
            op,
            left: arg(left),
            right: arg(right),
        }));
        self
    }

    pub fn eq(self, left: &str, right: impl ToString) -> Self {
        let right = right.to_string();
        self.comparison(CompareOp::Eq, left, &right)
    }

    pub fn gt(self, left: &str, right: impl ToString) -> Self {
        let right = right.to_string();
        self.comparison(CompareOp::Gt, left, &right)
    }

    pub fn lt(self, left: &str, right: impl ToString) -> Self {
        let right = right.to_string();
        self.comparison(CompareOp::Lt, left, &right)
    }

    pub fn not_equal(mut self, left: &str, right: &str) -> Self {
        self.where_clauses
            .push(Clause::NotEqualPredicate(NotEqualPredicate {
                left: arg(left),
                right: arg(right),
            }));
        self
    }

    pub fn ground(mut self, value: Value, binding: &str) -> Self {
        self.where_clauses
            .push(Clause::GroundPredicate(GroundPredicate {
                value,
                binding: Symbol::new(binding),
            }));
        self
    }

    pub fn function_predicate(mut self, name: &str, args: &[&str]) -> Self {
        self.where_clauses
            .push(Clause::FunctionPredicate(super::FunctionPredicate {
                name: name.to_string(),
                args: args.iter().map(|a| arg(a)).collect(),
            }));
        self
    }

    pub fn subquery(mut self, subquery: super::SubqueryPattern) -> Self {
        self.where_clauses.push(Clause::SubqueryPattern(subquery));
        self
    }

    pub fn build(self) -> Query {
        Query::new(self.find, self.inputs, self.where_clauses)
    }
}

#[allow(unused)]
pub(crate) fn arith_op_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}
