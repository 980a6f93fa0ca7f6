//! Inline type assertions for use inside function bodies.

use thiserror::Error;

use crate::expr::{TypeSet, TypeTag, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("Value {value} of type {actual} is not among the allowed types: {}", allowed_list(.allowed, .nullable))]
    NotAllowed {
        value: Value,
        actual: TypeTag,
        allowed: TypeSet,
        /// `None` was accepted as well.
        nullable: bool,
    },
}

fn allowed_list(allowed: &TypeSet, nullable: &bool) -> String {
    if *nullable {
        format!("NoneType, {}", allowed)
    } else {
        allowed.to_string()
    }
}

/// Pass `value` through if it is an instance of one of `types`.
pub fn typed(value: Value, types: &TypeSet) -> Result<Value, CheckError> {
    if value.is_instance(types) {
        Ok(value)
    } else {
        Err(CheckError::NotAllowed {
            actual: value.type_tag(),
            value,
            allowed: types.clone(),
            nullable: false,
        })
    }
}

/// Like [`typed`], but `None` is always accepted.
pub fn ntyped(value: Value, types: &TypeSet) -> Result<Value, CheckError> {
    if value == Value::None || value.is_instance(types) {
        Ok(value)
    } else {
        Err(CheckError::NotAllowed {
            actual: value.type_tag(),
            value,
            allowed: types.clone(),
            nullable: true,
        })
    }
}

/// Whether every item is an instance of one of `types`.
pub fn consists_of<'a, I>(items: I, types: &TypeSet) -> bool
where
    I: IntoIterator<Item = &'a Value>,
{
    items.into_iter().all(|item| item.is_instance(types))
}
