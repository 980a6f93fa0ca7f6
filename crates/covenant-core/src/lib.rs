//! # covenant-core
//!
//! Runtime enforcement of function contracts declared in documentation.
//!
//! A function's documentation declares argument types, a return type,
//! preconditions and postconditions as epydoc fields. Decorating the
//! function compiles those declarations once; every call of the decorated
//! function is then checked against them.
//!
//! ## Key Guarantees
//!
//! 1. **Fixed order**: argument types, preconditions, the call, return type,
//!    postconditions; the first failure stops the call
//! 2. **Precise diagnostics**: every failure names the function's origin,
//!    the clause involved and the offending value
//! 3. **Sandboxed clauses**: expressions only see the scopes they are given
//! 4. **Zero cost when off**: with enforcement disabled, decoration returns
//!    the function untouched
//!
//! ## Example
//!
//! ```rust
//! use covenant_core::{contract_with, module_info, Args, EnforcementConfig, FunctionDef, Value};
//!
//! let def = FunctionDef::new(module_info!(), "add", ["a1", "a2"]).doc(
//!     "@type a1: int\n\
//!      @type a2: int\n\
//!      @precondition: a1 > 0\n\
//!      @postcondition: result > 0",
//! );
//! let add = contract_with(EnforcementConfig::enabled(), &def, |args: &Args| {
//!     match (args.lookup(0, "a1"), args.lookup(1, "a2")) {
//!         (Some(Value::Int(a)), Some(Value::Int(b))) => Ok::<_, String>(Value::Int(a + b)),
//!         _ => Err("bad arguments".to_string()),
//!     }
//! })?;
//!
//! assert_eq!(add.call(&Args::new().arg(5).arg(6)).unwrap(), Value::Int(11));
//! assert!(add.call(&Args::new().arg(-5).arg(6)).is_err());
//! # Ok::<(), covenant_core::ContractError>(())
//! ```

pub mod checks;
pub mod config;
pub mod docstring;
pub mod enforcer;
pub mod error;
pub mod expr;
pub mod function;
pub mod location;

// Re-export main types at crate root
pub use checks::{consists_of, ntyped, typed, CheckError};
pub use config::{ConfigError, EnforcementConfig};
pub use docstring::{ContractDoc, DocExtractor, EpydocExtractor, ExtractError};
pub use enforcer::{contract, contract_with, ContractSpec, Decorated, Enforcer, RESULT_BINDING};
pub use error::{CallError, ContractEntity, ContractError, ErrorKind, Malformation};
pub use expr::{CompiledExpr, ExprError, Scope, TypeSet, TypeTag, Value};
pub use function::{Args, CallableKind, FunctionDef};
pub use location::{ModuleInfo, Origin};

/// The [`ModuleInfo`] of the module this macro is invoked in, without
/// globals.
#[macro_export]
macro_rules! module_info {
    () => {
        $crate::location::ModuleInfo::new(::core::module_path!(), ::core::file!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_info_macro() {
        let info = module_info!();
        assert_eq!(info.name, "covenant_core::tests");
        assert!(info.file.ends_with("lib.rs"));
        assert!(info.globals.is_empty());
    }
}
