//! Descriptions of contracted functions and the arguments they are called with.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::Value;
use crate::location::ModuleInfo;

/// How a function is dispatched.
///
/// Static- and class-dispatch kinds describe functions that have already been
/// turned into a dispatch wrapper. Contracts must be attached before that
/// happens, so decorating them is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    /// A free function, or an associated function decorated before being
    /// attached to its type.
    #[default]
    Function,
    /// A function taking the receiver as its first parameter.
    Method,
    StaticMethod,
    ClassMethod,
}

impl CallableKind {
    pub fn is_supported(self) -> bool {
        matches!(self, CallableKind::Function | CallableKind::Method)
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallableKind::Function => "function",
            CallableKind::Method => "method",
            CallableKind::StaticMethod => "static method",
            CallableKind::ClassMethod => "class method",
        };
        write!(f, "{}", name)
    }
}

/// A function about to be decorated: its signature, where it lives, and
/// the documentation its contract is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub module: ModuleInfo,
    pub name: String,
    /// Positional parameter names, in signature order.
    pub params: Vec<String>,
    #[serde(default)]
    pub kind: CallableKind,
    #[serde(default)]
    pub doc: String,
}

impl FunctionDef {
    pub fn new<I, S>(module: ModuleInfo, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module,
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            kind: CallableKind::Function,
            doc: String::new(),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn kind(mut self, kind: CallableKind) -> Self {
        self.kind = kind;
        self
    }
}

/// The arguments of one call: positional values plus named values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    #[serde(default)]
    positional: Vec<Value>,
    #[serde(default)]
    named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a named argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// The argument for the parameter at `index` called `name`, whether it
    /// was passed by name or by position.
    pub fn lookup(&self, index: usize, name: &str) -> Option<&Value> {
        self.named.get(name).or_else(|| self.positional.get(index))
    }
}

impl<V: Into<Value>> FromIterator<V> for Args {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            positional: iter.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }
}
