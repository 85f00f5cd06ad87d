//! # dlplanner
//!
//! Query planner for a Datalog-style query engine: takes a parsed `:find`/
//! `:in`/`:where` query and turns it into a [`RealizedPlan`] an executor can
//! run directly, without ever touching the executor itself.
//!
//! ## Pipeline
//!
//! ```text
//! Query
//!   → build_phases            (§4.3  entity-grouped or fine-grained phases)
//!   → assign_expressions      (§4.4  earliest-phase expression placement)
//!   → assign_predicates       (§4.5  predicate classification, Eq-as-binder)
//!   → pushdown                (§4.7  storage constraints, time extraction)
//!   → assign_subqueries       (§4.6  recursive nested-query planning)
//!   → rewrite::correlated_aggregate (§4.8 optional, off by default)
//!   → rewrite::decorrelate    (§4.9  optional subquery merging)
//!   → reorder_phases          (§4.10 greedy dependency-respecting order)
//!   → recompute_symbol_sets   (§4.11 available/provides/keep)
//!   → validate                (§4.12 reachability + function arity checks)
//!   → realize                 (§4.13 flatten into RealizedPlan)
//!   → PlanCache                (§4.14 optional, keyed on shape-affecting options)
//! ```
//!
//! ## Example
//!
//! ```
//! use dlplanner::{plan, PlannerOptions, QueryBuilder};
//!
//! let query = QueryBuilder::new()
//!     .find_var("?e")
//!     .find_var("?n")
//!     .pattern("?e", ":person/name", "?n")
//!     .gt("?e", 100)
//!     .build();
//!
//! let realized = plan(&query, &PlannerOptions::default()).unwrap();
//! assert_eq!(realized.phases[0].find, query.find);
//! ```

pub mod analysis;
pub mod ast;
pub mod cache;
pub mod config;
pub mod error;
pub mod expr_assign;
pub mod options;
pub mod phase_builder;
pub mod plan;
pub mod planner;
pub mod predicate_assign;
pub mod pushdown;
pub mod realize;
pub mod registry;
pub mod reorder;
pub mod rewrite;
pub mod scoring;
pub mod statistics;
pub mod subquery_assign;
pub mod symbol;
pub mod symbols;
pub mod validate;
pub mod value;

pub use ast::builders::QueryBuilder;
pub use ast::{Clause, Query};
pub use cache::{CacheConfig, CacheStats, PlanCache};
pub use config::PlannerConfig;
pub use error::{PlanError, PlanResult};
pub use options::PlannerOptions;
pub use planner::{plan, plan_with_bindings};
pub use realize::{RealizedPhase, RealizedPlan};
pub use registry::FunctionRegistry;
pub use statistics::{NoStatistics, Statistics, StaticStatistics};
pub use symbol::Symbol;
pub use value::Value;
