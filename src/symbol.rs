//! # Symbol
//!
//! An opaque, structurally-equal identifier for a query-level variable
//! (source syntax `?foo`). Symbols are cheap to clone (backed by `Arc<str>`)
//! since the planner threads the same handful of symbols through many
//! `HashSet`/`Vec` bookkeeping structures per phase.

use std::fmt;
use std::sync::Arc;

/// A query variable, e.g. `?e`, `?name`.
///
/// Equality and ordering are purely structural (string comparison); two
/// `Symbol`s built from the same text are always equal regardless of where
/// they were constructed, which is what lets clause analysis compare
/// `requires`/`provides` sets across independently-parsed clauses.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Construct a symbol from its source text, e.g. `"?e"`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::new(s)
    }
}

impl serde::Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::new(s))
    }
}
