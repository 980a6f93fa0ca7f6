//! Errors raised while compiling or evaluating a contract expression.

use thiserror::Error;

use super::value::TypeTag;

/// A failure to parse or evaluate an expression.
///
/// Parse errors carry the byte offset into the expression text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character {ch:?} at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal starting at offset {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number literal {text:?} at offset {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("unexpected {found} at offset {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: usize,
    },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("{type_name} value has no attribute '{attr}'")]
    NoAttribute { type_name: String, attr: String },

    #[error("unsupported operand type(s) for {op}: {lhs} and {rhs}")]
    UnsupportedOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("bad operand type for unary {op}: {operand}")]
    BadOperand { op: &'static str, operand: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{0} value is not subscriptable")]
    NotSubscriptable(String),

    #[error("{0} value is not iterable")]
    NotIterable(String),

    #[error("'{0}' is not a callable builtin")]
    NotCallable(String),

    #[error("{func}() {message}")]
    BadCall { func: String, message: String },

    #[error("expected a type or a tuple of types, found a {0} entity")]
    NotAType(TypeTag),
}
