//! Scoped variable environment
//!
//! A stack of scopes holding [`Quantity`] bindings. The bottom scope is the
//! session's global scope and is never popped; `let` bodies and function
//! calls push and pop scopes around their evaluation.

use crate::quantity::Quantity;
use std::collections::HashMap;

/// A single lexical scope.
#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Quantity>,
}

/// Scoped environment with a stack of scopes.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create an environment with one global scope.
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope::default()],
        }
    }

    /// Push a new innermost scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope. The global scope stays.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind a name in the innermost scope, shadowing outer bindings.
    pub fn define(&mut self, name: String, value: Quantity) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name, value);
        }
    }

    /// Look a name up, innermost scope first.
    pub fn get(&self, name: &str) -> Option<Quantity> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.bindings.get(name) {
                return Some(value.clone());
            }
        }
        None
    }

    /// All visible binding names, for suggestions.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .iter()
            .flat_map(|s| s.bindings.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Every visible binding with shadowing applied, outermost first.
    pub fn flatten(&self) -> HashMap<String, Quantity> {
        let mut all = HashMap::new();
        for scope in &self.scopes {
            for (name, value) in &scope.bindings {
                all.insert(name.clone(), value.clone());
            }
        }
        all
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
