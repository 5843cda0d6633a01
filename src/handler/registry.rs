//! Var registry for dispatching invokes by fully-qualified var name.
//!
//! The pod exposes one namespace with two vars. The registry maps
//! `<namespace>/<var>` to the [`Verb`] that runs it and builds the
//! [`Namespace`] advertised by `describe`.
//!
//! # Example
//!
//! ```
//! use sqlpod::handler::{VarRegistry, Verb};
//!
//! let registry = VarRegistry::new("pod.sqlpod");
//! assert_eq!(registry.resolve("pod.sqlpod/query"), Some(Verb::Query));
//! assert_eq!(registry.resolve("pod.sqlpod/drop!"), None);
//! ```

use std::collections::HashMap;

use crate::protocol::{Namespace, Var};

/// Default namespace name.
pub const DEFAULT_NAMESPACE: &str = "pod.sqlpod";

/// The two operations the pod can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Run a statement for its side effects.
    Execute,
    /// Run a statement and return its rows.
    Query,
}

impl Verb {
    /// All verbs, in advertised order.
    pub const ALL: [Verb; 2] = [Verb::Execute, Verb::Query];

    /// Unqualified var name.
    pub fn var_name(self) -> &'static str {
        match self {
            Verb::Execute => "execute!",
            Verb::Query => "query",
        }
    }
}

/// Registry mapping qualified var names to verbs.
#[derive(Debug, Clone)]
pub struct VarRegistry {
    namespace: String,
    /// Qualified name to verb.
    vars: HashMap<String, Verb>,
}

impl VarRegistry {
    /// Register both verbs under `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let vars = Verb::ALL
            .iter()
            .map(|verb| (format!("{namespace}/{}", verb.var_name()), *verb))
            .collect();
        Self { namespace, vars }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Look up the verb for a qualified var name.
    pub fn resolve(&self, var: &str) -> Option<Verb> {
        self.vars.get(var).copied()
    }

    /// Build the namespace advertised by `describe`. Vars carry no code.
    pub fn build_namespace(&self) -> Namespace {
        Namespace {
            name: self.namespace.clone(),
            vars: Verb::ALL.iter().map(|verb| Var::new(verb.var_name())).collect(),
        }
    }
}

impl Default for VarRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_qualified_names() {
        let registry = VarRegistry::default();
        assert_eq!(registry.resolve("pod.sqlpod/execute!"), Some(Verb::Execute));
        assert_eq!(registry.resolve("pod.sqlpod/query"), Some(Verb::Query));
    }

    #[test]
    fn test_unqualified_or_foreign_names_rejected() {
        let registry = VarRegistry::default();
        assert_eq!(registry.resolve("query"), None);
        assert_eq!(registry.resolve("other.ns/query"), None);
        assert_eq!(registry.resolve(""), None);
    }

    #[test]
    fn test_custom_namespace() {
        let registry = VarRegistry::new("my.db");
        assert_eq!(registry.namespace(), "my.db");
        assert_eq!(registry.resolve("my.db/execute!"), Some(Verb::Execute));
        assert_eq!(registry.resolve("pod.sqlpod/execute!"), None);
    }

    #[test]
    fn test_build_namespace() {
        let namespace = VarRegistry::default().build_namespace();
        assert_eq!(namespace.name, "pod.sqlpod");
        let names: Vec<_> = namespace.vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["execute!", "query"]);
        assert!(namespace.vars.iter().all(|v| v.code.is_none()));
    }
}
