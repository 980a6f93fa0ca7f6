//! Contract enforcement.
//!
//! Decorating a function reads its contract once, compiles every clause and
//! resolves its [`Origin`]. Each call of the [`Decorated`] function then runs
//! in a fixed order, stopping at the first failure:
//!
//! 1. bind arguments to parameter names,
//! 2. check declared argument types,
//! 3. check preconditions,
//! 4. call the wrapped function,
//! 5. check the declared return type,
//! 6. check postconditions, which only see `result`.

use std::sync::Arc;

use crate::config::{self, EnforcementConfig};
use crate::docstring::{ContractDoc, DocExtractor, EpydocExtractor};
use crate::error::{CallError, ContractEntity, ContractError, Malformation};
use crate::expr::{CompiledExpr, Scope, TypeSet, Value};
use crate::function::{Args, FunctionDef};
use crate::location::Origin;

/// Name under which postconditions see the return value.
pub const RESULT_BINDING: &str = "result";

/// A contract compiled at decoration time. Never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractSpec {
    origin: Origin,
    params: Vec<String>,
    /// Declared parameter types, in signature order.
    param_types: Vec<(String, CompiledExpr)>,
    return_type: Option<CompiledExpr>,
    preconditions: Vec<CompiledExpr>,
    postconditions: Vec<CompiledExpr>,
}

impl ContractSpec {
    /// Compile the clauses of `doc` for a function at `origin`.
    pub fn compile(origin: Origin, doc: &ContractDoc) -> Result<Self, ContractError> {
        for (name, text) in &doc.param_types {
            if !doc.params.contains(name) {
                return Err(ContractError::malformed(
                    &origin,
                    ContractEntity::ParamType(name.clone()),
                    text,
                    Malformation::UnknownParameter,
                ));
            }
        }

        let mut param_types = Vec::with_capacity(doc.param_types.len());
        for name in &doc.params {
            if let Some(text) = doc.param_type(name) {
                let expr = compile_clause(&origin, ContractEntity::ParamType(name.clone()), text)?;
                param_types.push((name.clone(), expr));
            }
        }

        let return_type = doc
            .return_type
            .as_deref()
            .map(|text| compile_clause(&origin, ContractEntity::ReturnType, text))
            .transpose()?;

        let preconditions = doc
            .preconditions
            .iter()
            .map(|text| compile_clause(&origin, ContractEntity::Precondition, text))
            .collect::<Result<Vec<_>, _>>()?;

        let postconditions = doc
            .postconditions
            .iter()
            .map(|text| compile_clause(&origin, ContractEntity::Postcondition, text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            params: doc.params.clone(),
            param_types,
            return_type,
            preconditions,
            postconditions,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn param_type(&self, name: &str) -> Option<&CompiledExpr> {
        self.param_types
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, expr)| expr)
    }

    pub fn return_type(&self) -> Option<&CompiledExpr> {
        self.return_type.as_ref()
    }

    pub fn preconditions(&self) -> &[CompiledExpr] {
        &self.preconditions
    }

    pub fn postconditions(&self) -> &[CompiledExpr] {
        &self.postconditions
    }

    /// Number of clauses checked on every call.
    pub fn clause_count(&self) -> usize {
        self.param_types.len()
            + usize::from(self.return_type.is_some())
            + self.preconditions.len()
            + self.postconditions.len()
    }

    /// Map the call's arguments onto parameter names: positional arguments
    /// by position, then named arguments on top.
    pub fn bind(&self, args: &Args) -> Scope {
        let mut bound: Scope = self
            .params
            .iter()
            .zip(args.positional())
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        for (name, value) in args.named() {
            bound.bind(name.as_str(), value.clone());
        }
        bound
    }

    /// Check every declared argument type against the bound arguments.
    pub fn check_arguments(&self, globals: &Scope, bound: &Scope) -> Result<(), ContractError> {
        let empty = Scope::new();
        for (param, expr) in &self.param_types {
            let expected =
                self.eval_types(expr, ContractEntity::ParamType(param.clone()), globals, &empty)?;
            let value = bound.get(param).ok_or_else(|| ContractError::MissingArgument {
                origin: self.origin.clone(),
                param: param.clone(),
            })?;
            if !value.is_instance(&expected) {
                return Err(ContractError::ArgumentType {
                    origin: self.origin.clone(),
                    param: param.clone(),
                    actual: value.type_tag(),
                    expected,
                    value: value.clone(),
                });
            }
            tracing::trace!(origin = %self.origin, param = %param, "Argument type satisfied");
        }
        Ok(())
    }

    /// Check preconditions, in declaration order, against the bound arguments.
    pub fn check_preconditions(&self, globals: &Scope, bound: &Scope) -> Result<(), ContractError> {
        for expr in &self.preconditions {
            let value = self.eval_condition(expr, ContractEntity::Precondition, globals, bound)?;
            if !value.is_truthy() {
                return Err(ContractError::Precondition {
                    origin: self.origin.clone(),
                    expr: expr.source().to_string(),
                    value,
                });
            }
            tracing::trace!(origin = %self.origin, clause = expr.source(), "Precondition holds");
        }
        Ok(())
    }

    pub fn check_return(&self, globals: &Scope, result: &Value) -> Result<(), ContractError> {
        let Some(expr) = &self.return_type else {
            return Ok(());
        };
        let expected = self.eval_types(expr, ContractEntity::ReturnType, globals, &Scope::new())?;
        if !result.is_instance(&expected) {
            return Err(ContractError::ReturnType {
                origin: self.origin.clone(),
                actual: result.type_tag(),
                expected,
                value: result.clone(),
            });
        }
        tracing::trace!(origin = %self.origin, "Return type satisfied");
        Ok(())
    }

    /// Check postconditions with only `result` bound.
    pub fn check_postconditions(&self, globals: &Scope, result: &Value) -> Result<(), ContractError> {
        if self.postconditions.is_empty() {
            return Ok(());
        }
        let locals = Scope::new().with(RESULT_BINDING, result.clone());
        for expr in &self.postconditions {
            let value = self.eval_condition(expr, ContractEntity::Postcondition, globals, &locals)?;
            if !value.is_truthy() {
                return Err(ContractError::Postcondition {
                    origin: self.origin.clone(),
                    expr: expr.source().to_string(),
                    value,
                });
            }
            tracing::trace!(origin = %self.origin, clause = expr.source(), "Postcondition holds");
        }
        Ok(())
    }

    fn eval_types(
        &self,
        expr: &CompiledExpr,
        entity: ContractEntity,
        globals: &Scope,
        locals: &Scope,
    ) -> Result<TypeSet, ContractError> {
        expr.evaluate_types(globals, locals)
            .map_err(|err| ContractError::malformed(&self.origin, entity, expr.source(), err))
    }

    fn eval_condition(
        &self,
        expr: &CompiledExpr,
        entity: ContractEntity,
        globals: &Scope,
        locals: &Scope,
    ) -> Result<Value, ContractError> {
        expr.evaluate(globals, locals)
            .map_err(|err| ContractError::malformed(&self.origin, entity, expr.source(), err))
    }
}

fn compile_clause(
    origin: &Origin,
    entity: ContractEntity,
    text: &str,
) -> Result<CompiledExpr, ContractError> {
    CompiledExpr::compile(text).map_err(|err| ContractError::malformed(origin, entity, text, err))
}

/// A function returned by decoration: either wrapped with its compiled
/// contract, or passed through untouched when enforcement was off.
///
/// Cloning is cheap; clones share the contract.
#[derive(Debug, Clone)]
pub struct Decorated<F> {
    body: F,
    checks: Option<Arc<Enforced>>,
}

#[derive(Debug)]
struct Enforced {
    spec: ContractSpec,
    globals: Scope,
}

impl<F> Decorated<F> {
    fn pass_through(body: F) -> Self {
        Self { body, checks: None }
    }

    /// The compiled contract. Always `None` in builds without `enforce`, so
    /// every call goes straight to the body.
    fn enforced(&self) -> Option<&Enforced> {
        if cfg!(feature = "enforce") {
            self.checks.as_deref()
        } else {
            None
        }
    }

    /// Whether calls are checked.
    pub fn is_enforced(&self) -> bool {
        self.enforced().is_some()
    }

    pub fn spec(&self) -> Option<&ContractSpec> {
        self.enforced().map(|enforced| &enforced.spec)
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.spec().map(ContractSpec::origin)
    }

    /// The defining module's bindings, used by [`Decorated::call`]. Only
    /// kept when calls are checked.
    pub fn globals(&self) -> Option<&Scope> {
        self.enforced().map(|enforced| &enforced.globals)
    }

    /// Call with contract expressions resolved against the defining
    /// module's globals.
    pub fn call<E>(&self, args: &Args) -> Result<Value, CallError<E>>
    where
        F: Fn(&Args) -> Result<Value, E>,
    {
        match self.enforced() {
            Some(enforced) => self.checked(&enforced.spec, &enforced.globals, args),
            None => (self.body)(args).map_err(CallError::Callable),
        }
    }

    /// Call with contract expressions resolved against `caller`, the
    /// bindings visible where the call is made.
    pub fn call_from<E>(&self, caller: &Scope, args: &Args) -> Result<Value, CallError<E>>
    where
        F: Fn(&Args) -> Result<Value, E>,
    {
        match self.enforced() {
            Some(enforced) => self.checked(&enforced.spec, caller, args),
            None => (self.body)(args).map_err(CallError::Callable),
        }
    }

    fn checked<E>(&self, spec: &ContractSpec, scope: &Scope, args: &Args) -> Result<Value, CallError<E>>
    where
        F: Fn(&Args) -> Result<Value, E>,
    {
        let bound = spec.bind(args);
        spec.check_arguments(scope, &bound).map_err(violation)?;
        spec.check_preconditions(scope, &bound).map_err(violation)?;

        let result = (self.body)(args).map_err(CallError::Callable)?;

        spec.check_return(scope, &result).map_err(violation)?;
        spec.check_postconditions(scope, &result).map_err(violation)?;
        Ok(result)
    }
}

fn violation<E>(err: ContractError) -> CallError<E> {
    tracing::warn!(kind = %err.kind(), origin = %err.origin(), "Contract violated");
    CallError::Contract(err)
}

/// Decorates functions with the contracts their documentation declares.
#[derive(Debug, Clone, Default)]
pub struct Enforcer<X = EpydocExtractor> {
    extractor: X,
    config: EnforcementConfig,
}

impl Enforcer {
    pub fn new(config: EnforcementConfig) -> Self {
        Self {
            extractor: EpydocExtractor::new(),
            config,
        }
    }

    /// An enforcer following the process-wide configuration.
    pub fn from_global() -> Self {
        Self::new(config::current())
    }
}

impl<X: DocExtractor> Enforcer<X> {
    /// Replace the documentation extractor.
    pub fn with_extractor<Y: DocExtractor>(self, extractor: Y) -> Enforcer<Y> {
        Enforcer {
            extractor,
            config: self.config,
        }
    }

    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    /// Wrap `body` with the contract declared in `def`'s documentation.
    ///
    /// The origin is resolved from the frames active on this thread right
    /// now, so decorate inside the [`crate::location::enter`] guards that
    /// describe where the function is nested. With enforcement off, `body`
    /// is returned as a pass-through and nothing is checked, now or later.
    pub fn decorate<F>(&self, def: &FunctionDef, body: F) -> Result<Decorated<F>, ContractError> {
        if !self.config.checks_active() {
            tracing::debug!(function = %def.name, "Enforcement disabled, passing through");
            return Ok(Decorated::pass_through(body));
        }

        let origin = Origin::resolve(&def.module, &def.name);

        if !def.kind.is_supported() {
            let err = ContractError::UnsupportedCallable {
                origin,
                kind: def.kind,
            };
            tracing::warn!(kind = %def.kind, error = %err, "Rejected decoration");
            return Err(err);
        }

        let doc = self
            .extractor
            .extract(def)
            .map_err(|source| ContractError::Documentation {
                origin: origin.clone(),
                source,
            })?;
        let spec = ContractSpec::compile(origin, &doc)?;

        tracing::debug!(
            origin = %spec.origin,
            clauses = spec.clause_count(),
            preconditions = spec.preconditions.len(),
            postconditions = spec.postconditions.len(),
            "Decorated function"
        );

        Ok(Decorated {
            body,
            checks: Some(Arc::new(Enforced {
                spec,
                globals: def.module.globals.clone(),
            })),
        })
    }
}

/// Decorate `body` following the process-wide configuration.
pub fn contract<F>(def: &FunctionDef, body: F) -> Result<Decorated<F>, ContractError> {
    Enforcer::from_global().decorate(def, body)
}

/// Decorate `body` with an explicit configuration.
pub fn contract_with<F>(
    config: EnforcementConfig,
    def: &FunctionDef,
    body: F,
) -> Result<Decorated<F>, ContractError> {
    Enforcer::new(config).decorate(def, body)
}
