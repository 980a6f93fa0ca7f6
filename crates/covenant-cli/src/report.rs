//! Lint and verify reports, rendered as text or JSON.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use covenant_core::{ContractError, ErrorKind};

/// A contract failure as shown in reports.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Finding {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ContractError> for Finding {
    fn from(err: &ContractError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What happened when one recorded call was replayed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Passed { result: String },
    /// The function's own recorded error came back untouched.
    CallableError { message: String },
    Violation(Finding),
    ExpectedViolation { kind: ErrorKind },
    /// A violation was expected but the call went through.
    MissedViolation { expected: ErrorKind },
}

impl CallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CallOutcome::Violation(_) | CallOutcome::MissedViolation { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallReport {
    /// 1-based position in the manifest.
    pub index: usize,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionReport {
    /// Dotted name including enclosing scopes.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub enforced: bool,
    pub clauses: usize,
    /// Why decoration failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallReport>,
}

impl FunctionReport {
    pub fn failures(&self) -> usize {
        usize::from(self.rejected.is_some())
            + self.calls.iter().filter(|c| c.outcome.is_failure()).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub command: String,
    pub manifest: String,
    pub generated_at: DateTime<Utc>,
    pub checks_enabled: bool,
    pub functions: Vec<FunctionReport>,
    pub violations: usize,
}

impl Report {
    pub fn new(
        command: impl Into<String>,
        manifest: impl Into<String>,
        checks_enabled: bool,
        functions: Vec<FunctionReport>,
    ) -> Self {
        let violations = functions.iter().map(FunctionReport::failures).sum();
        Self {
            command: command.into(),
            manifest: manifest.into(),
            generated_at: Utc::now(),
            checks_enabled,
            functions,
            violations,
        }
    }

    pub fn has_violations(&self) -> bool {
        self.violations > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "covenant {} {}: {} function(s), {} violation(s){}",
            self.command,
            self.manifest,
            self.functions.len(),
            self.violations,
            if self.checks_enabled { "" } else { " [checks disabled]" }
        );

        for function in &self.functions {
            let status = if function.failures() > 0 { "FAIL" } else { "ok" };
            match &function.rejected {
                Some(finding) => {
                    let _ = writeln!(out, "  {:<5} {} ({})", status, function.name, finding.kind);
                    push_indented(&mut out, &finding.message, 8);
                }
                None if function.enforced => {
                    let _ = writeln!(
                        out,
                        "  {:<5} {} ({} clause(s))",
                        status, function.name, function.clauses
                    );
                }
                None => {
                    let _ = writeln!(out, "  {:<5} {} (not enforced)", status, function.name);
                }
            }

            for call in &function.calls {
                match &call.outcome {
                    CallOutcome::Passed { result } => {
                        let _ = writeln!(out, "        call {}: passed -> {}", call.index, result);
                    }
                    CallOutcome::CallableError { message } => {
                        let _ = writeln!(out, "        call {}: raised {}", call.index, message);
                    }
                    CallOutcome::ExpectedViolation { kind } => {
                        let _ = writeln!(out, "        call {}: expected {} violation", call.index, kind);
                    }
                    CallOutcome::MissedViolation { expected } => {
                        let _ = writeln!(
                            out,
                            "        call {}: expected {} violation, but the call passed",
                            call.index, expected
                        );
                    }
                    CallOutcome::Violation(finding) => {
                        let _ = writeln!(out, "        call {}: {} violation", call.index, finding.kind);
                        push_indented(&mut out, &finding.message, 10);
                    }
                }
            }
        }
        out
    }
}

fn push_indented(out: &mut String, text: &str, width: usize) {
    for line in text.lines() {
        let _ = writeln!(out, "{:width$}{}", "", line, width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report::new(
            "verify",
            "calc.yaml",
            true,
            vec![
                FunctionReport {
                    name: "Calc.add".into(),
                    origin: Some("calc module (calc.rs), Calc.add()".into()),
                    enforced: true,
                    clauses: 2,
                    rejected: None,
                    calls: vec![
                        CallReport {
                            index: 1,
                            outcome: CallOutcome::Passed {
                                result: "11".into(),
                            },
                        },
                        CallReport {
                            index: 2,
                            outcome: CallOutcome::Violation(Finding {
                                kind: ErrorKind::Precondition,
                                message: "calc module (calc.rs), Calc.add():\nThe following precondition results in logical False".into(),
                            }),
                        },
                        CallReport {
                            index: 3,
                            outcome: CallOutcome::MissedViolation {
                                expected: ErrorKind::ReturnType,
                            },
                        },
                    ],
                },
                FunctionReport {
                    name: "broken".into(),
                    origin: None,
                    enforced: false,
                    clauses: 0,
                    rejected: Some(Finding {
                        kind: ErrorKind::MalformedContract,
                        message: "m module (m.rs), broken():\nThe following precondition could not be parsed".into(),
                    }),
                    calls: vec![],
                },
            ],
        )
    }

    #[test]
    fn test_violations_counted() {
        let report = sample();
        assert_eq!(report.violations, 3);
        assert!(report.has_violations());
    }

    #[test]
    fn test_text_rendering() {
        let text = sample().to_text();
        assert!(text.starts_with("covenant verify calc.yaml: 2 function(s), 3 violation(s)\n"));
        assert!(text.contains("  FAIL  Calc.add (2 clause(s))\n"));
        assert!(text.contains("        call 1: passed -> 11\n"));
        assert!(text.contains("        call 2: precondition violation\n"));
        assert!(text.contains("          The following precondition results in logical False\n"));
        assert!(text.contains("  FAIL  broken (malformed contract)\n"));
    }

    #[test]
    fn test_json_rendering() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["violations"], 3);
        let calls = &json["functions"][0]["calls"];
        assert_eq!(calls[0]["status"], "passed");
        assert_eq!(calls[1]["status"], "violation");
        assert_eq!(calls[1]["kind"], "precondition");
        assert_eq!(calls[2]["expected"], "return_type");
        assert!(json["functions"][1].get("calls").is_none());
        assert!(json["generated_at"].is_string());
    }
}
