//! Contract failures and the error type of a decorated call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::docstring::ExtractError;
use crate::expr::{ExprError, TypeSet, TypeTag, Value};
use crate::function::CallableKind;
use crate::location::Origin;

/// The contract clause a malformed declaration belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEntity {
    ParamType(String),
    ReturnType,
    Precondition,
    Postcondition,
}

impl fmt::Display for ContractEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractEntity::ParamType(name) => {
                write!(f, "type definition for parameter '{}'", name)
            }
            ContractEntity::ReturnType => write!(f, "type definition for return value"),
            ContractEntity::Precondition => write!(f, "precondition"),
            ContractEntity::Postcondition => write!(f, "postcondition"),
        }
    }
}

/// What is wrong with a malformed declaration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Malformation {
    #[error("could not be parsed ({0})")]
    Unparseable(ExprError),

    #[error("should define a type rather than a {found} entity")]
    NotAType { found: TypeTag },

    #[error("names a parameter missing from the signature")]
    UnknownParameter,
}

impl From<ExprError> for Malformation {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::NotAType(found) => Malformation::NotAType { found },
            other => Malformation::Unparseable(other),
        }
    }
}

/// Coarse classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedCallable,
    MalformedContract,
    ArgumentType,
    Precondition,
    ReturnType,
    Postcondition,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedCallable => "unsupported callable",
            ErrorKind::MalformedContract => "malformed contract",
            ErrorKind::ArgumentType => "argument type",
            ErrorKind::Precondition => "precondition",
            ErrorKind::ReturnType => "return type",
            ErrorKind::Postcondition => "postcondition",
        };
        write!(f, "{}", name)
    }
}

/// A contract failure, raised either when a function is decorated or when
/// a decorated function is called.
///
/// Every message starts with the function's [`Origin`] label.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error(
        "{origin}:\nContracts cannot be attached to a {kind}; \
         decorate the plain function before turning it into a {kind}"
    )]
    UnsupportedCallable { origin: Origin, kind: CallableKind },

    #[error("{origin}:\nThe following {entity} {reason}: {text}")]
    MalformedContract {
        origin: Origin,
        entity: ContractEntity,
        text: String,
        reason: Malformation,
    },

    #[error("{origin}:\nThe documentation could not be read: {source}")]
    Documentation {
        origin: Origin,
        source: ExtractError,
    },

    #[error(
        "{origin}:\nThe '{param}' argument is of {actual} while must be of {expected}; \
         its value is {value}"
    )]
    ArgumentType {
        origin: Origin,
        param: String,
        actual: TypeTag,
        expected: TypeSet,
        value: Value,
    },

    #[error("{origin}:\nThe '{param}' argument has a declared type but was not supplied")]
    MissingArgument { origin: Origin, param: String },

    #[error(
        "{origin}:\nThe following precondition results in logical False; \
         its definition is:\n\t{expr}\nand its real value is {value}"
    )]
    Precondition {
        origin: Origin,
        expr: String,
        value: Value,
    },

    #[error(
        "{origin}:\nThe following return value is of {actual} while must be of {expected}: \
         {value}"
    )]
    ReturnType {
        origin: Origin,
        actual: TypeTag,
        expected: TypeSet,
        value: Value,
    },

    #[error(
        "{origin}:\nThe following postcondition results in logical False; \
         its definition is:\n\t{expr}\nand its real value is {value}"
    )]
    Postcondition {
        origin: Origin,
        expr: String,
        value: Value,
    },
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::UnsupportedCallable { .. } => ErrorKind::UnsupportedCallable,
            ContractError::MalformedContract { .. } | ContractError::Documentation { .. } => {
                ErrorKind::MalformedContract
            }
            ContractError::ArgumentType { .. } | ContractError::MissingArgument { .. } => {
                ErrorKind::ArgumentType
            }
            ContractError::Precondition { .. } => ErrorKind::Precondition,
            ContractError::ReturnType { .. } => ErrorKind::ReturnType,
            ContractError::Postcondition { .. } => ErrorKind::Postcondition,
        }
    }

    pub fn origin(&self) -> &Origin {
        match self {
            ContractError::UnsupportedCallable { origin, .. }
            | ContractError::MalformedContract { origin, .. }
            | ContractError::Documentation { origin, .. }
            | ContractError::ArgumentType { origin, .. }
            | ContractError::MissingArgument { origin, .. }
            | ContractError::Precondition { origin, .. }
            | ContractError::ReturnType { origin, .. }
            | ContractError::Postcondition { origin, .. } => origin,
        }
    }

    /// Whether the failure was raised while decorating rather than calling.
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedCallable | ErrorKind::MalformedContract
        )
    }

    pub(crate) fn malformed(
        origin: &Origin,
        entity: ContractEntity,
        text: &str,
        reason: impl Into<Malformation>,
    ) -> Self {
        ContractError::MalformedContract {
            origin: origin.clone(),
            entity,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// The error of a decorated call: either a contract failure or the wrapped
/// function's own error, passed through untouched.
#[derive(Error, Debug)]
pub enum CallError<E> {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("{0}")]
    Callable(E),
}

impl<E> CallError<E> {
    pub fn is_contract(&self) -> bool {
        matches!(self, CallError::Contract(_))
    }

    pub fn contract(&self) -> Option<&ContractError> {
        match self {
            CallError::Contract(err) => Some(err),
            CallError::Callable(_) => None,
        }
    }

    pub fn into_contract(self) -> Option<ContractError> {
        match self {
            CallError::Contract(err) => Some(err),
            CallError::Callable(_) => None,
        }
    }

    pub fn into_callable(self) -> Option<E> {
        match self {
            CallError::Contract(_) => None,
            CallError::Callable(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin {
            module: "calc".into(),
            file: "src/calc.rs".into(),
            nesting: String::new(),
            function: "f".into(),
        }
    }

    #[test]
    fn test_argument_type_message() {
        let err = ContractError::ArgumentType {
            origin: origin(),
            param: "a1".into(),
            actual: TypeTag::Int,
            expected: TypeSet::single(TypeTag::Str),
            value: Value::Int(1),
        };
        assert_eq!(
            err.to_string(),
            "calc module (src/calc.rs), f():\n\
             The 'a1' argument is of <int> while must be of <str>; its value is 1"
        );
        assert_eq!(err.kind(), ErrorKind::ArgumentType);
        assert!(!err.is_authoring_error());
    }

    #[test]
    fn test_condition_message_keeps_literal_value() {
        let err = ContractError::Postcondition {
            origin: origin(),
            expr: "result % 2".into(),
            value: Value::Int(0),
        };
        assert_eq!(
            err.to_string(),
            "calc module (src/calc.rs), f():\n\
             The following postcondition results in logical False; its definition is:\n\
             \tresult % 2\nand its real value is 0"
        );
    }

    #[test]
    fn test_malformed_message() {
        let err = ContractError::malformed(
            &origin(),
            ContractEntity::ParamType("a1".into()),
            "'int'",
            ExprError::NotAType(TypeTag::Str),
        );
        assert_eq!(
            err.to_string(),
            "calc module (src/calc.rs), f():\n\
             The following type definition for parameter 'a1' should define a type \
             rather than a <str> entity: 'int'"
        );
        assert!(err.is_authoring_error());
    }

    #[test]
    fn test_call_error_keeps_callable_identity() {
        let err: CallError<std::io::Error> =
            CallError::Callable(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!err.is_contract());
        assert_eq!(err.to_string(), "disk");
        assert_eq!(err.into_callable().unwrap().kind(), std::io::ErrorKind::Other);
    }
}
