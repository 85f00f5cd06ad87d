//! # Internal plan structures (§3 Data Model)
//!
//! The mutable, work-in-progress shape the planner builds up phase by phase
//! before [`crate::realize`] flattens it into the executor-facing
//! [`crate::realize::RealizedPlan`]. Everything here is private planner
//! bookkeeping — `PatternPlan::constraints`, `Phase::metadata`, and friends
//! never leak past realization.

use crate::ast::{Clause, CompareOp, DataPattern, Expression, FindElem, Query, TimeField};
use crate::realize::RealizedPlan;
use crate::symbol::Symbol;
use crate::value::Value;
use std::collections::BTreeSet;

/// Which of the four physical indexes (§4.2) a [`PatternPlan`] will scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Eavt,
    Aevt,
    Avet,
    Vaet,
}

impl IndexKind {
    pub fn name(self) -> &'static str {
        match self {
            IndexKind::Eavt => "EAVT",
            IndexKind::Aevt => "AEVT",
            IndexKind::Avet => "AVET",
            IndexKind::Vaet => "VAET",
        }
    }
}

/// Which of a pattern's `[E A V (+T)]` elements are bound (constant, or
/// variable already in `resolved`) at the point the pattern is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundMask {
    pub e: bool,
    pub a: bool,
    pub v: bool,
    pub t: bool,
}

impl BoundMask {
    pub fn any(self) -> bool {
        self.e || self.a || self.v || self.t
    }
}

/// Sentinel selectivity score (§4.2: "a distinguished sentinel like `-1`")
/// for a pattern with zero bound elements under a non-empty `resolved` set —
/// deferred rather than scheduled now.
pub const UNPLANNABLE: i64 = -1;

/// A predicate converted into a structured hint attached to a
/// [`PatternPlan`] during pushdown (§4.7), re-materialized as an equivalent
/// `where`-clause at realization time (§4.13, invariant 6) so execution
/// stays correct even if storage ignores the constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConstraint {
    Equality { attribute: String, value: Value },
    Range { attribute: String, op: CompareOp, value: Value },
    TimeExtraction {
        attribute: String,
        field: TimeField,
        op: CompareOp,
        value: Value,
        /// The symbol the original time-extraction expression bound (the
        /// pattern's value-position variable is matched back to this at
        /// realization time, see §4.13).
        extracted_symbol: Symbol,
    },
}

impl StorageConstraint {
    /// Selectivity multiplier applied to a pattern's cardinality estimate
    /// once this constraint is attached (§4.7).
    pub fn selectivity_factor(&self) -> f64 {
        match self {
            StorageConstraint::Equality { .. } => 0.01,
            StorageConstraint::Range { .. } => 0.2,
            StorageConstraint::TimeExtraction { field, .. } => match field {
                TimeField::Day => 1.0 / 30.0,
                TimeField::Hour => 1.0 / 24.0,
                TimeField::Month => 1.0 / 12.0,
                TimeField::Minute => 1.0 / 60.0,
                TimeField::Second => 1.0 / 60.0,
                TimeField::Year => 1.0,
            },
        }
    }
}

/// A planned [`DataPattern`]: chosen index, bound mask, selectivity score,
/// bound variables, and any pushed-down storage constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPlan {
    pub pattern: DataPattern,
    pub index: IndexKind,
    pub bound: BoundMask,
    /// Lower is more selective; `UNPLANNABLE` defers the pattern.
    pub selectivity: i64,
    pub binds: Vec<Symbol>,
    pub constraints: Vec<StorageConstraint>,
}

impl PatternPlan {
    pub fn entity_symbol(&self) -> Option<&Symbol> {
        self.pattern.e.as_variable()
    }

    pub fn value_symbol(&self) -> Option<&Symbol> {
        self.pattern.v.as_variable()
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.pattern.a.as_variable().map(Symbol::as_str).or_else(|| {
            // constant attribute position holds a Value::Keyword
            match &self.pattern.a {
                crate::ast::PatternElement::Constant(v) => v.as_attribute(),
                _ => None,
            }
        })
    }
}

/// How a [`PredicatePlan`]'s clause classifies (§3 Data Model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateClass {
    Equality,
    Comparison,
    TimeExtraction,
    ChainedComparison,
    NotEqual,
    Ground,
    Missing,
    Function,
    Unknown,
}

/// A predicate clause plus the bookkeeping the pushdown and assignment
/// passes need: its classification, the extracted operand triple where
/// applicable, and its full required-symbol set.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicatePlan {
    pub clause: Clause,
    pub class: PredicateClass,
    pub variable: Option<Symbol>,
    pub value: Option<Value>,
    pub operator: Option<CompareOp>,
    pub required_vars: Vec<Symbol>,
}

/// A [`crate::ast::SubqueryPattern`] placed into a phase, carrying its fully
/// planned nested query.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryPlan {
    pub clause: crate::ast::SubqueryPattern,
    pub nested: RealizedPlan,
    /// Set by the decorrelator (§4.9) / correlated-aggregate rewriter
    /// (§4.8): the executor skips running this subquery per outer tuple and
    /// instead reads from the phase's `decorrelated_subqueries` (for §4.9)
    /// or the rewritten inline patterns + `ConditionalAggregate` (for §4.8).
    pub decorrelated: bool,
}

/// `(correlation-vars, is_grouped_aggregate)` — the grouping key for
/// decorrelation (§4.9 "Correlation signature").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationSignature {
    pub correlation_vars: BTreeSet<Symbol>,
    pub is_grouped_aggregate: bool,
}

/// One subquery's contribution to a merged decorrelated query (§4.9 "Result
/// mapping"): which result columns are its grouping keys vs. its own
/// aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorrelatedMember {
    /// Index into the owning `Phase::subqueries`.
    pub subquery_index: usize,
    pub grouping_symbols: Vec<Symbol>,
    pub aggregate_symbols: Vec<Symbol>,
}

/// One filter group merged into a single grouped-aggregate query (§4.9
/// "Merged query construction").
#[derive(Debug, Clone, PartialEq)]
pub struct DecorrelatedGroup {
    pub signature: CorrelationSignature,
    pub merged_plan: RealizedPlan,
    pub members: Vec<DecorrelatedMember>,
}

/// `{binding, aggregate}` recorded by the correlated-aggregate rewriter
/// (§4.8) in place of the original subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalAggregate {
    pub binding: Symbol,
    pub aggregate: FindElem,
    /// The synthesized filter symbol (possibly an AND of several `condN`s)
    /// gating this aggregate.
    pub filter_symbol: Symbol,
}

/// Open metadata a phase accumulates from optional passes. Modeled as a
/// typed struct rather than spec.md's literal "open metadata map" so every
/// field has a concrete owner pass; nothing here is read by more than one
/// pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseMetadata {
    /// Symbols a decorrelated/rewritten aggregate still needs, used by
    /// keep-recomputation (§4.11) and the rewriter's post-fixup (§4.8).
    pub aggregate_required_columns: Vec<Symbol>,
    pub conditional_aggregates: Vec<ConditionalAggregate>,
    /// Best-effort decorrelation/rewrite failures recorded instead of
    /// failing the whole plan (§7).
    pub notes: Vec<String>,
}

/// One sequential unit of execution (Glossary: "Phase"). Phases are mutated
/// in place through most of the pipeline; [`crate::realize`] is the only
/// place a `Phase` is consumed by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phase {
    pub patterns: Vec<PatternPlan>,
    pub expressions: Vec<Expression>,
    pub predicates: Vec<PredicatePlan>,
    pub subqueries: Vec<SubqueryPlan>,
    pub decorrelated_subqueries: Vec<DecorrelatedGroup>,
    pub join_predicates: Vec<PredicatePlan>,

    pub available: Vec<Symbol>,
    pub provides: Vec<Symbol>,
    pub keep: Vec<Symbol>,

    /// Set only on the last phase, preserving the original query's find
    /// elements (including aggregates) for realization (§4.13).
    pub find: Option<Vec<FindElem>>,

    pub metadata: PhaseMetadata,
}

impl Phase {
    pub fn is_empty_of_clauses(&self) -> bool {
        self.patterns.is_empty()
            && self.expressions.is_empty()
            && self.predicates.is_empty()
            && self.subqueries.is_empty()
    }

    /// Union of every variable this phase's clauses require, used by the
    /// reorderer (§4.10) and keep recomputation (§4.11).
    pub fn required_symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        for p in &self.patterns {
            out.extend(p.constraints.iter().filter_map(constraint_symbol));
        }
        for e in &self.expressions {
            out.extend(e.args.iter().filter_map(|a| a.as_var().cloned()));
        }
        for p in &self.predicates {
            out.extend(p.required_vars.iter().cloned());
        }
        for jp in &self.join_predicates {
            out.extend(jp.required_vars.iter().cloned());
        }
        for s in &self.subqueries {
            out.extend(s.clause.outer_symbols().cloned());
        }
        out
    }

    /// Every variable appearing in this phase's pattern elements, regardless
    /// of whether this phase itself binds it. Distinct from
    /// `required_symbols`: a pattern never *requires* a symbol to run (it's
    /// a producer), but a later phase reusing one of this phase's pattern
    /// variables as a join key still needs it kept around (§4.11 step 3).
    pub fn pattern_element_symbols(&self) -> Vec<Symbol> {
        self.patterns
            .iter()
            .flat_map(|p| p.pattern.elements().filter_map(|e| e.as_variable().cloned()))
            .collect()
    }
}

fn constraint_symbol(_c: &StorageConstraint) -> Option<Symbol> {
    // Storage constraints reference attributes/values, not free symbols that
    // still need resolving by a later phase — the variable they constrain
    // is already bound by the pattern they're attached to.
    None
}

/// The fully-built, not-yet-realized plan threaded through §4.3-§4.12.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalPlan {
    pub phases: Vec<Phase>,
}

/// Carries the original query alongside the evolving [`InternalPlan`] so
/// every pass has access to `find`/`inputs` without threading them as
/// separate arguments.
pub struct PlanContext<'a> {
    pub query: &'a Query,
}
