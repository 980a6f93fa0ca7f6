//! Contract expression language.
//!
//! Type declarations and conditions are small expressions: comparisons,
//! arithmetic, membership, boolean connectives, attribute access and a
//! handful of builtins. They are parsed once into an AST when a function is
//! decorated and evaluated per call against an explicit two-tier scope.
//! There is no assignment and no way to reach outside the supplied scopes.

mod error;
mod eval;
mod lexer;
mod parser;
mod scope;
mod value;

pub use error::ExprError;
pub use eval::values_equal;
pub use parser::{BinOp, CmpOp, Expr, UnaryOp};
pub use scope::{Env, Scope};
pub use value::{TypeSet, TypeTag, Value, CLASS_KEY};

/// An expression parsed ahead of time, together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    ast: Expr,
}

impl CompiledExpr {
    /// Parse `source`. Surrounding whitespace is not part of the expression.
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let source = source.trim();
        let ast = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate to any value; callers interpret the result by truthiness.
    pub fn evaluate(&self, globals: &Scope, locals: &Scope) -> Result<Value, ExprError> {
        eval::evaluate(&self.ast, &Env::new(globals, locals))
    }

    /// Evaluate as a type declaration: the result must be a type or a
    /// tuple of types.
    pub fn evaluate_types(&self, globals: &Scope, locals: &Scope) -> Result<TypeSet, ExprError> {
        let value = self.evaluate(globals, locals)?;
        TypeSet::from_value(&value).map_err(ExprError::NotAType)
    }
}

/// Parse and evaluate in one step.
pub fn eval_str(source: &str, globals: &Scope, locals: &Scope) -> Result<Value, ExprError> {
    CompiledExpr::compile(source)?.evaluate(globals, locals)
}
