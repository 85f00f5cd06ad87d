//! # Optional rewrite passes (§4.8, §4.9)
//!
//! Both rewriters are opt-in (`PlannerOptions::conditional_aggregate_rewriting`
//! / `subquery_decorrelation`) and run after subquery assignment, before the
//! phase reorderer.

pub mod correlated_aggregate;
pub mod decorrelate;
