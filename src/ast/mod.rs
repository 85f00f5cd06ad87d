//! # Query AST
//!
//! Typed clause tree produced by the (external, out-of-scope) parser: a
//! `Query` is a `:find`/`:in`/`:where` triple, `:where` being an ordered list
//! of `Clause` variants. This module owns only the data model — clause
//! symbol analysis (`requires`/`provides`) lives in [`crate::analysis`] so
//! that the tree itself stays a plain sum type with no behavior baked in.
//!
//! ## Builders
//!
//! For programmatic construction (tests, the structural-properties harness,
//! callers that already have a parsed/desugared tree) see the [`builders`]
//! module's fluent `QueryBuilder`.

use crate::symbol::Symbol;
use crate::value::Value;
use serde::{Deserialize, Serialize};

pub mod builders;

// ============================================================================
// Query shape
// ============================================================================

/// One element of a `:find` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FindElem {
    Variable(Symbol),
    Aggregate { func: AggregateFunc, arg: Symbol },
}

impl FindElem {
    pub fn symbol(&self) -> &Symbol {
        match self {
            FindElem::Variable(s) => s,
            FindElem::Aggregate { arg, .. } => arg,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, FindElem::Aggregate { .. })
    }
}

/// Aggregation functions usable in a `:find` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

/// Sort direction for an optional `:order-by` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// A parsed (or programmatically built) Datalog query.
///
/// `inputs` names only the *declared parameter symbols* of the query's own
/// `:in` clause (plus, conventionally, the database marker symbol `$` as the
/// first entry when the query takes one) — never runtime values. This is
/// what lets §4.6 disambiguate alpha-renaming between an outer query and a
/// nested subquery's own `:in`, and what lets §4.14's cache key treat `:in`
/// as "structure only."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub find: Vec<FindElem>,
    pub inputs: Vec<Symbol>,
    pub where_clauses: Vec<Clause>,
    pub order_by: Option<Vec<(Symbol, OrderDir)>>,
}

impl Query {
    pub fn new(find: Vec<FindElem>, inputs: Vec<Symbol>, where_clauses: Vec<Clause>) -> Self {
        Query {
            find,
            inputs,
            where_clauses,
            order_by: None,
        }
    }

    /// The database marker symbol, if this query declares one as its first
    /// `:in` parameter (conventionally named `$`).
    pub fn database_input(&self) -> Option<&Symbol> {
        self.inputs.first().filter(|s| s.as_str() == "$")
    }

    /// `:in` parameters excluding the database marker.
    pub fn value_inputs(&self) -> impl Iterator<Item = &Symbol> {
        self.inputs.iter().filter(|s| s.as_str() != "$")
    }
}

// ============================================================================
// Clause sum type
// ============================================================================

/// One clause of a `:where` list.
///
/// Every variant implements the `requires`/`provides` contract described in
/// spec.md §3/§4.1 — see [`crate::analysis::clause_symbols`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    DataPattern(DataPattern),
    Expression(Expression),
    Comparison(Comparison),
    ChainedComparison(ChainedComparison),
    NotEqualPredicate(NotEqualPredicate),
    GroundPredicate(GroundPredicate),
    MissingPredicate(MissingPredicate),
    FunctionPredicate(FunctionPredicate),
    SubqueryPattern(SubqueryPattern),
}

impl Clause {
    pub fn is_pattern(&self) -> bool {
        matches!(self, Clause::DataPattern(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Clause::Expression(_))
    }

    pub fn is_subquery(&self) -> bool {
        matches!(self, Clause::SubqueryPattern(_))
    }

    /// True for the predicate-shaped variants (everything that is neither a
    /// pattern, an expression, nor a subquery).
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Clause::Comparison(_)
                | Clause::ChainedComparison(_)
                | Clause::NotEqualPredicate(_)
                | Clause::GroundPredicate(_)
                | Clause::MissingPredicate(_)
                | Clause::FunctionPredicate(_)
        )
    }
}

/// One element of a `[E A V (+T)]` data pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternElement {
    Variable(Symbol),
    Constant(Value),
    /// `_`: matches anything, binds nothing.
    Blank,
}

impl PatternElement {
    pub fn as_variable(&self) -> Option<&Symbol> {
        match self {
            PatternElement::Variable(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, PatternElement::Constant(_))
    }

    pub fn is_bound(&self, resolved: &std::collections::HashSet<Symbol>) -> bool {
        match self {
            PatternElement::Constant(_) => true,
            PatternElement::Blank => false,
            PatternElement::Variable(s) => resolved.contains(s),
        }
    }
}

/// `[E A V]`, optionally carrying a transaction element `+T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPattern {
    pub e: PatternElement,
    pub a: PatternElement,
    pub v: PatternElement,
    pub t: Option<PatternElement>,
}

impl DataPattern {
    pub fn new(e: PatternElement, a: PatternElement, v: PatternElement) -> Self {
        DataPattern { e, a, v, t: None }
    }

    pub fn with_tx(mut self, t: PatternElement) -> Self {
        self.t = Some(t);
        self
    }

    pub fn elements(&self) -> impl Iterator<Item = &PatternElement> {
        [&self.e, &self.a, &self.v].into_iter().chain(self.t.iter())
    }
}

/// A function application producing a single output binding, e.g.
/// `[(str ?a ?c) ?result]` or `[(day ?t) ?d]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub function: ExprFunction,
    pub args: Vec<ExprArg>,
    pub binding: Symbol,
}

/// An operand of an expression/predicate: either a query variable or a
/// literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprArg {
    Var(Symbol),
    Const(Value),
}

impl ExprArg {
    pub fn as_var(&self) -> Option<&Symbol> {
        match self {
            ExprArg::Var(s) => Some(s),
            ExprArg::Const(_) => None,
        }
    }
}

/// The function an [`Expression`] applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprFunction {
    Arithmetic(ArithOp),
    /// String concatenation: `(str a b c ...)`.
    Concat,
    /// `(identity x)`.
    Identity,
    /// Constant producer: `(ground v)`.
    Ground,
    /// `(year|month|day|hour|minute|second ?t)`.
    TimeExtract(TimeField),
    /// A comparison used to produce a boolean binding rather than filter
    /// directly, e.g. the internal `(= inner_var outer_var) condN` synthesized
    /// by the correlated-aggregate rewriter (§4.8).
    ComparisonAsFunction(CompareOp),
    /// A user/namespaced function, looked up in the function registry.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The field a time-extraction expression reads out of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    pub fn name(self) -> &'static str {
        match self {
            TimeField::Year => "year",
            TimeField::Month => "month",
            TimeField::Day => "day",
            TimeField::Hour => "hour",
            TimeField::Minute => "minute",
            TimeField::Second => "second",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// `[(op a b)]` — two-operand comparison predicate, `op` one of
/// `= < <= > >=`. An `Eq` comparison between one unbound variable and one
/// constant is reclassified as a binder by [`crate::analysis`]; see
/// `DESIGN.md` Open Question 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    pub left: ExprArg,
    pub right: ExprArg,
}

/// `[(< a b c ...)]` — a chain of comparisons sharing one operator, e.g.
/// `a < b < c`, modeled as consecutive-pair comparisons over an ordered
/// operand list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedComparison {
    pub op: CompareOp,
    pub operands: Vec<ExprArg>,
}

/// `[(not= a b)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotEqualPredicate {
    pub left: ExprArg,
    pub right: ExprArg,
}

/// An explicit ground-value binder clause: binds `binding` to the literal
/// `value`. Distinct from an `Eq` `Comparison` that is *inferred* to act as a
/// binder by shape (see `DESIGN.md` Open Question 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundPredicate {
    pub value: Value,
    pub binding: Symbol,
}

/// `[(missing? $ ?e :attr)]` — true iff `attr` is absent on `entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPredicate {
    pub entity: ExprArg,
    pub attribute: Value,
}

/// A named predicate call, e.g. `[(foo/bar ?x "test")]`, resolved against the
/// function registry (§9, §6 `UnknownFunction`/`WrongArity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPredicate {
    pub name: String,
    pub args: Vec<ExprArg>,
}

/// The binding form of a subquery/pull result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingForm {
    Scalar(Symbol),
    Tuple(Vec<Symbol>),
    Collection(Symbol),
    Relation(Vec<Symbol>),
}

impl BindingForm {
    /// Symbols this binding form introduces, flattened.
    pub fn symbols(&self) -> Vec<Symbol> {
        match self {
            BindingForm::Scalar(s) => vec![s.clone()],
            BindingForm::Collection(s) => vec![s.clone()],
            BindingForm::Tuple(v) | BindingForm::Relation(v) => v.clone(),
        }
    }
}

/// One argument passed into a nested subquery's `:in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubqueryInput {
    Symbol(Symbol),
    /// The literal database marker `$`.
    Database,
}

/// `[(q nested-query in-args...) binding-form]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubqueryPattern {
    pub query: Box<Query>,
    pub inputs: Vec<SubqueryInput>,
    pub binding: BindingForm,
}

impl SubqueryPattern {
    /// Non-database variables referenced in the outer scope by this call.
    pub fn outer_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.inputs.iter().filter_map(|i| match i {
            SubqueryInput::Symbol(s) => Some(s),
            SubqueryInput::Database => None,
        })
    }
}
