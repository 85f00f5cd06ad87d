//! # Function Registry
//!
//! A table of `name -> (arity, classification)` used to validate
//! [`crate::ast::FunctionPredicate`] clauses (§4.12) and to classify
//! [`crate::ast::Expression`] functions during clause analysis.
//!
//! §9 Design Notes observes that a process-wide static and a value-level
//! registry passed in with options are equivalent; this crate uses the
//! value-level form so the planner itself stays free of mutable global
//! state (§5). `registry::builtin()` is the shared default instance callers
//! construct once (typically wrapped in an `Arc`) and reuse across calls —
//! "append-only across the process lifetime" in practice means "build it
//! once, then only ever call `register`, never `unregister`."

use std::collections::HashMap;

/// How a registered function behaves with respect to symbol binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    /// Pure function of its arguments; used in `Expression` position.
    Scalar,
    /// Boolean-valued; used in `FunctionPredicate` position.
    Predicate,
}

/// An entry in the [`FunctionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub arity: usize,
    pub class: FunctionClass,
}

/// Process-wide (by convention) table of known function names.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    pub fn register(&mut self, name: impl Into<String>, arity: usize, class: FunctionClass) {
        self.functions.insert(name.into(), FunctionSpec { arity, class });
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionSpec> {
        self.functions.get(name).copied()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

/// The standard arithmetic/string/time/comparison functions the spec's
/// `Expression` and `FunctionPredicate` variants need out of the box.
/// Anything outside this set (e.g. `foo/bar` in §8 scenario S5) is simply
/// absent, which is how `UnknownFunction` fires.
pub fn builtin() -> FunctionRegistry {
    let mut reg = FunctionRegistry::new();
    reg.register("+", 2, FunctionClass::Scalar);
    reg.register("-", 2, FunctionClass::Scalar);
    reg.register("*", 2, FunctionClass::Scalar);
    reg.register("/", 2, FunctionClass::Scalar);
    reg.register("str", 2, FunctionClass::Scalar);
    reg.register("identity", 1, FunctionClass::Scalar);
    reg.register("ground", 1, FunctionClass::Scalar);
    for field in ["year", "month", "day", "hour", "minute", "second"] {
        reg.register(field, 1, FunctionClass::Scalar);
    }
    for op in ["=", "<", "<=", ">", ">="] {
        reg.register(op, 2, FunctionClass::Predicate);
    }
    reg.register("not=", 2, FunctionClass::Predicate);
    reg.register("missing?", 2, FunctionClass::Predicate);
    reg
}
