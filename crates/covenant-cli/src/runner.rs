//! Lint and replay manifests through the enforcer.

use std::cell::RefCell;
use std::rc::Rc;

use covenant_core::location::{self, FrameGuard};
use covenant_core::{Args, CallError, ContractError, Decorated, Enforcer, Value};

use crate::manifest::{CallSpec, FunctionSpec, Manifest, ManifestError};
use crate::report::{CallOutcome, CallReport, Finding, FunctionReport};

type Recorded = Rc<RefCell<Result<Value, String>>>;

/// Decorates manifest functions with bodies that replay recorded outcomes.
pub struct Runner<'a> {
    manifest: &'a Manifest,
    enforcer: Enforcer,
}

impl<'a> Runner<'a> {
    pub fn new(manifest: &'a Manifest, enforcer: Enforcer) -> Self {
        Self { manifest, enforcer }
    }

    /// Decorate every function, reporting malformed or unsupported contracts.
    pub fn lint(&self) -> Result<Vec<FunctionReport>, ManifestError> {
        self.manifest
            .functions
            .iter()
            .map(|function| self.prepare(function).map(|(report, _)| report))
            .collect()
    }

    /// Decorate every function and replay its recorded calls.
    pub fn verify(&self) -> Result<Vec<FunctionReport>, ManifestError> {
        let mut reports = Vec::with_capacity(self.manifest.functions.len());
        for function in &self.manifest.functions {
            let (mut report, decorated) = self.prepare(function)?;
            if let Some((decorated, recorded)) = decorated {
                for (i, call) in function.calls.iter().enumerate() {
                    let outcome = replay(&decorated, &recorded, call)?;
                    tracing::debug!(function = %report.name, call = i + 1, ?outcome, "Replayed call");
                    report.calls.push(CallReport {
                        index: i + 1,
                        outcome,
                    });
                }
            }
            reports.push(report);
        }
        Ok(reports)
    }

    #[allow(clippy::type_complexity)]
    fn prepare(
        &self,
        function: &FunctionSpec,
    ) -> Result<(FunctionReport, Option<(Decorated<impl Fn(&Args) -> Result<Value, String>>, Recorded)>), ManifestError>
    {
        let def = self.manifest.function_def(function)?;
        let recorded: Recorded = Rc::new(RefCell::new(Ok(Value::None)));
        let body = {
            let recorded = Rc::clone(&recorded);
            move |_: &Args| recorded.borrow().clone()
        };

        let decorated = {
            let _module = location::enter_module();
            let _frames: Vec<FrameGuard> = function.nesting.iter().map(location::enter).collect();
            self.enforcer.decorate(&def, body)
        };

        let mut report = FunctionReport {
            name: qualified_name(function),
            origin: None,
            enforced: false,
            clauses: 0,
            rejected: None,
            calls: Vec::new(),
        };

        match decorated {
            Ok(decorated) => {
                report.enforced = decorated.is_enforced();
                if let Some(spec) = decorated.spec() {
                    report.origin = Some(spec.origin().to_string());
                    report.clauses = spec.clause_count();
                }
                Ok((report, Some((decorated, recorded))))
            }
            Err(err) => {
                tracing::debug!(function = %report.name, error = %err, "Decoration rejected");
                report.rejected = Some(Finding::from(&err));
                Ok((report, None))
            }
        }
    }
}

fn qualified_name(function: &FunctionSpec) -> String {
    function
        .nesting
        .iter()
        .chain(std::iter::once(&function.name))
        .cloned()
        .collect::<Vec<_>>()
        .join(".")
}

fn replay<F>(
    decorated: &Decorated<F>,
    recorded: &Recorded,
    call: &CallSpec,
) -> Result<CallOutcome, ManifestError>
where
    F: Fn(&Args) -> Result<Value, String>,
{
    *recorded.borrow_mut() = call.outcome();
    let args = call.args();
    let result = match call.caller_scope()? {
        Some(caller) => decorated.call_from(&caller, &args),
        None => decorated.call(&args),
    };

    Ok(match (result, call.expect) {
        (Err(CallError::Contract(err)), Some(expected)) if err.kind() == expected => {
            CallOutcome::ExpectedViolation { kind: expected }
        }
        (Err(CallError::Contract(err)), _) => violation(&err),
        (Ok(_), Some(expected)) | (Err(CallError::Callable(_)), Some(expected)) => {
            CallOutcome::MissedViolation { expected }
        }
        (Ok(value), None) => CallOutcome::Passed {
            result: value.to_string(),
        },
        (Err(CallError::Callable(message)), None) => CallOutcome::CallableError { message },
    })
}

fn violation(err: &ContractError) -> CallOutcome {
    CallOutcome::Violation(Finding::from(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{EnforcementConfig, ErrorKind};

    const MANIFEST: &str = r#"
module:
  name: calc
  file: src/calc.rs
  globals:
    number: {type: float}
functions:
  - name: add
    params: [a1, a2]
    nesting: [A, B]
    doc: |
      @type a1: int
      @type a2: (int, number)
      @precondition: a1 > 0
      @precondition: a2 > 0
      @rtype: (int, number)
      @postcondition: result % 2
    calls:
      - args: [5, 6]
        returns: 11
      - args: [-5, 0]
        expect: precondition
      - args: [4, 6]
        returns: 10
      - kwargs: {a1: "x", a2: 1}
      - args: [1, 2]
        raises: "overflow"
      - args: [1, 2]
        returns: 3
        expect: return_type
      - args: [1, 2.5]
        caller: {number: {type: str}}
  - name: shout
    kind: static_method
    doc: "@rtype: str"
  - name: parse
    params: [text]
    doc: "@precondition: len(text) >"
"#;

    fn enforcer() -> Enforcer {
        Enforcer::new(EnforcementConfig::enabled())
    }

    #[test]
    fn test_lint_reports_authoring_errors() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let reports = Runner::new(&manifest, enforcer()).lint().unwrap();
        assert_eq!(reports.len(), 3);

        assert_eq!(reports[0].name, "A.B.add");
        assert_eq!(
            reports[0].origin.as_deref(),
            Some("calc module (src/calc.rs), A.B.add()")
        );
        assert_eq!(reports[0].clauses, 6);
        assert!(reports[0].calls.is_empty());

        assert_eq!(
            reports[1].rejected.as_ref().map(|f| f.kind),
            Some(ErrorKind::UnsupportedCallable)
        );
        assert_eq!(
            reports[2].rejected.as_ref().map(|f| f.kind),
            Some(ErrorKind::MalformedContract)
        );
    }

    #[test]
    fn test_verify_replays_calls() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let reports = Runner::new(&manifest, enforcer()).verify().unwrap();
        let outcomes: Vec<&CallOutcome> = reports[0].calls.iter().map(|c| &c.outcome).collect();

        assert_eq!(
            outcomes[0],
            &CallOutcome::Passed {
                result: "11".into()
            }
        );
        assert_eq!(
            outcomes[1],
            &CallOutcome::ExpectedViolation {
                kind: ErrorKind::Precondition
            }
        );
        assert!(matches!(outcomes[2], CallOutcome::Violation(f) if f.kind == ErrorKind::Postcondition));
        assert!(matches!(outcomes[3], CallOutcome::Violation(f) if f.kind == ErrorKind::ArgumentType));
        assert_eq!(
            outcomes[4],
            &CallOutcome::CallableError {
                message: "overflow".into()
            }
        );
        assert_eq!(
            outcomes[5],
            &CallOutcome::MissedViolation {
                expected: ErrorKind::ReturnType
            }
        );
        // With `number` bound to str at the call site, a float argument no longer matches.
        assert!(matches!(outcomes[6], CallOutcome::Violation(f) if f.kind == ErrorKind::ArgumentType));

        assert_eq!(reports[0].failures(), 4);
    }

    #[test]
    fn test_disabled_checks_pass_everything_through() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let runner = Runner::new(&manifest, Enforcer::new(EnforcementConfig::disabled()));
        let reports = runner.verify().unwrap();
        assert!(reports.iter().all(|r| r.rejected.is_none() && !r.enforced));
        assert!(matches!(
            reports[0].calls[1].outcome,
            CallOutcome::MissedViolation {
                expected: ErrorKind::Precondition
            }
        ));
        assert_eq!(
            reports[0].calls[4].outcome,
            CallOutcome::CallableError {
                message: "overflow".into()
            }
        );
    }
}
