//! Runtime values and type tags for contract expressions.
//!
//! [`Value`] is the dynamic counterpart of whatever a contracted function
//! accepts and returns. Contract clauses are evaluated over values, and
//! type declarations evaluate to [`TypeSet`]s that values are checked against.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime type of a [`Value`].
///
/// Named classes stand in for user-defined types; an [`Value::Object`]
/// carries the class name it was built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Type,
    /// The root type; every value is an instance of it.
    Object,
    /// A user-defined class, matched by name.
    Class(String),
}

impl TypeTag {
    /// Resolve one of the builtin type names (`int`, `str`, `NoneType`, ...).
    pub fn builtin(name: &str) -> Option<TypeTag> {
        let tag = match name {
            "NoneType" => TypeTag::NoneType,
            "bool" => TypeTag::Bool,
            "int" => TypeTag::Int,
            "float" => TypeTag::Float,
            "str" => TypeTag::Str,
            "list" => TypeTag::List,
            "tuple" => TypeTag::Tuple,
            "type" => TypeTag::Type,
            "object" => TypeTag::Object,
            _ => return None,
        };
        Some(tag)
    }

    /// The bare type name, as written in contract expressions.
    pub fn name(&self) -> &str {
        match self {
            TypeTag::NoneType => "NoneType",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::List => "list",
            TypeTag::Tuple => "tuple",
            TypeTag::Type => "type",
            TypeTag::Object => "object",
            TypeTag::Class(name) => name,
        }
    }

    /// Whether `self` is `other` or derives from it.
    ///
    /// `bool` is a subtype of `int`, and everything is a subtype of `object`.
    pub fn is_subtype_of(&self, other: &TypeTag) -> bool {
        match (self, other) {
            (_, TypeTag::Object) => true,
            (TypeTag::Bool, TypeTag::Int) => true,
            (a, b) => a == b,
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        value.type_tag().is_subtype_of(self)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

/// The set of acceptable runtime types produced by a type declaration.
///
/// A declaration is either a single type (`int`) or a tuple of types
/// (`(int, str, NoneType)`); nested tuples are flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSet {
    types: Vec<TypeTag>,
    single: bool,
}

impl TypeSet {
    /// A set holding exactly one type.
    pub fn single(tag: TypeTag) -> Self {
        Self {
            types: vec![tag],
            single: true,
        }
    }

    /// A tuple of types.
    pub fn of(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        Self {
            types: tags.into_iter().collect(),
            single: false,
        }
    }

    /// Interpret an evaluated value as a type declaration.
    ///
    /// Returns the type of the offending value when `value` is neither a
    /// type nor a tuple of types.
    pub fn from_value(value: &Value) -> Result<Self, TypeTag> {
        match value {
            Value::Type(tag) => Ok(Self::single(tag.clone())),
            Value::Tuple(items) => {
                let mut types = Vec::with_capacity(items.len());
                for item in items {
                    types.extend(Self::from_value(item)?.types);
                }
                Ok(Self::of(types))
            }
            other => Err(other.type_tag()),
        }
    }

    pub fn types(&self) -> &[TypeTag] {
        &self.types
    }

    /// Whether `value` is an instance of any type in the set.
    pub fn contains(&self, value: &Value) -> bool {
        self.types.iter().any(|tag| tag.accepts(value))
    }

    /// Whether `tag` is a subtype of any type in the set.
    pub fn includes_type(&self, tag: &TypeTag) -> bool {
        self.types.iter().any(|t| tag.is_subtype_of(t))
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.single {
            if let Some(tag) = self.types.first() {
                return write!(f, "{}", tag);
            }
        }
        write!(f, "(")?;
        for (i, tag) in self.types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        if self.types.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

/// A runtime value seen by contract clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Type(TypeTag),
    /// An instance of a user-defined class with named fields.
    Object {
        class: String,
        fields: BTreeMap<String, Value>,
    },
}

impl Value {
    /// Build an object value of the given class.
    pub fn object<K, V>(class: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object {
            class: class.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The runtime type of this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::None => TypeTag::NoneType,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::List(_) => TypeTag::List,
            Value::Tuple(_) => TypeTag::Tuple,
            Value::Type(_) => TypeTag::Type,
            Value::Object { class, .. } => TypeTag::Class(class.clone()),
        }
    }

    /// Ordinary truthiness: `None`, `False`, zero and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Type(_) | Value::Object { .. } => true,
        }
    }

    /// Whether this value is an instance of any type in `types`.
    pub fn is_instance(&self, types: &TypeSet) -> bool {
        types.contains(self)
    }

    /// Look up a named field on an object value.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// The items of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// The plain-text rendering used by `str()`: strings are not quoted.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{}", quote)?;
    for ch in s.chars() {
        match ch {
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Renders the value as a literal (`'a'`, `1.0`, `None`, `(1,)`), which is
/// the form used in every diagnostic.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write_str_repr(f, s),
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Type(tag) => write!(f, "{}", tag),
            Value::Object { class, fields } => {
                write!(f, "{}(", class)?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<TypeTag> for Value {
    fn from(tag: TypeTag) -> Self {
        Value::Type(tag)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::None)
    }
}

/// Key naming the class of a JSON object converted into a [`Value::Object`].
pub const CLASS_KEY: &str = "__class__";

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(mut map) => {
                let class = match map.remove(CLASS_KEY) {
                    Some(serde_json::Value::String(class)) => class,
                    _ => "object".to_string(),
                };
                Value::Object {
                    class,
                    fields: map
                        .into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_matches_literal_syntax() {
        assert_eq!(Value::from("a").to_string(), "'a'");
        assert_eq!(Value::from("it's").to_string(), "\"it's\"");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Bool(false).to_string(), "False");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::from("x")]).to_string(),
            "[1, 'x']"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(Value::object("MyNum", [("i", 0)]).is_truthy());
    }

    #[test]
    fn test_bool_is_an_int_and_everything_is_an_object() {
        assert!(TypeTag::Int.accepts(&Value::Bool(true)));
        assert!(!TypeTag::Bool.accepts(&Value::Int(1)));
        assert!(TypeTag::Object.accepts(&Value::None));
        assert!(TypeTag::Class("MyNum".into()).accepts(&Value::object("MyNum", [("i", 1)])));
        assert!(!TypeTag::Class("Other".into()).accepts(&Value::object("MyNum", [("i", 1)])));
    }

    #[test]
    fn test_type_set_from_nested_tuple() {
        let value = Value::Tuple(vec![
            Value::Type(TypeTag::Int),
            Value::Tuple(vec![Value::Type(TypeTag::Str), Value::Type(TypeTag::NoneType)]),
        ]);
        let set = TypeSet::from_value(&value).unwrap();
        assert_eq!(set.types().len(), 3);
        assert!(set.contains(&Value::None));
        assert_eq!(set.to_string(), "(<int>, <str>, <NoneType>)");
    }

    #[test]
    fn test_type_set_rejects_non_types() {
        let err = TypeSet::from_value(&Value::Tuple(vec![Value::Type(TypeTag::Int), Value::Int(3)]))
            .unwrap_err();
        assert_eq!(err, TypeTag::Int);
        assert_eq!(TypeSet::from_value(&Value::from("int")).unwrap_err(), TypeTag::Str);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"__class__": "MyNum", "i": 15, "tags": ["a", null]});
        let value = Value::from(json);
        assert_eq!(value.type_tag(), TypeTag::Class("MyNum".into()));
        assert_eq!(value.attr("i"), Some(&Value::Int(15)));
        assert_eq!(
            value.attr("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::None]))
        );
        assert_eq!(Value::from(serde_json::json!(2.5)), Value::Float(2.5));
    }
}
