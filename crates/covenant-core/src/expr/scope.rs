//! Name bindings visible to contract expressions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// An immutable-by-evaluation mapping from names to values.
///
/// Expressions only ever borrow a scope, so evaluating one clause can never
/// leak state into the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope {
    bindings: BTreeMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Bind `name`, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The two-tier scope an expression is evaluated under.
///
/// Lookup order is locals, then globals, then builtin type names.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    pub globals: &'a Scope,
    pub locals: &'a Scope,
}

impl<'a> Env<'a> {
    pub fn new(globals: &'a Scope, locals: &'a Scope) -> Self {
        Self { globals, locals }
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }
}
