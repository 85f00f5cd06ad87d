//! # Statistics
//!
//! The read-only subset of the external statistics provider (§1, §5) the
//! planner actually consults: per-attribute cardinality, used by the
//! pattern scorer (§4.2) and by the pushdown selectivity estimate (§4.7).
//! The full collector (histograms, MCVs, per-column distinct counts) lives
//! in the storage engine, out of scope here — see `DESIGN.md`.

use std::collections::HashMap;

/// A read-only statistics handle. Implementations must be safe to hold by
/// shared reference across a whole `plan()` call (§5: "Statistics ... are
/// read-only during a plan call").
pub trait Statistics: Send + Sync {
    /// Approximate number of distinct values of `attribute`, if known.
    fn attribute_cardinality(&self, attribute: &str) -> Option<u64>;
}

/// A simple `HashMap`-backed [`Statistics`] for tests and callers without a
/// live storage engine.
#[derive(Debug, Clone, Default)]
pub struct StaticStatistics {
    cardinalities: HashMap<String, u64>,
}

impl StaticStatistics {
    pub fn new() -> Self {
        StaticStatistics::default()
    }

    pub fn with_cardinality(mut self, attribute: impl Into<String>, cardinality: u64) -> Self {
        self.cardinalities.insert(attribute.into(), cardinality);
        self
    }
}

impl Statistics for StaticStatistics {
    fn attribute_cardinality(&self, attribute: &str) -> Option<u64> {
        self.cardinalities.get(attribute).copied()
    }
}

/// A [`Statistics`] that knows nothing — every lookup returns `None`. Used
/// as the default when a caller doesn't supply a statistics provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatistics;

impl Statistics for NoStatistics {
    fn attribute_cardinality(&self, _attribute: &str) -> Option<u64> {
        None
    }
}
