//! Contract extraction from function documentation.
//!
//! Contracts are written as epydoc-style fields inside a function's
//! documentation:
//!
//! ```text
//! Add two positive numbers.
//!
//! @type a1: int
//! @type a2: (int, float)
//! @precondition: a1 > 0
//! @precondition: a2 > 0
//! @rtype: (int, float)
//! @postcondition: result > 0
//! ```
//!
//! Indented lines following a field continue it. Descriptive fields such as
//! `@param` or `@return` are accepted and ignored.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::function::FunctionDef;

lazy_static! {
    /// `@tag arg: body` or `@tag: body`
    static ref FIELD_PATTERN: Regex = Regex::new(
        r"^@(?P<tag>[A-Za-z_]+)(?:[ \t]+(?P<arg>[A-Za-z_][A-Za-z0-9_]*))?[ \t]*:(?P<body>.*)$"
    ).unwrap();
}

/// Fields that document rather than constrain.
const DESCRIPTIVE_FIELDS: &[&str] = &[
    "param", "parameter", "arg", "argument", "keyword", "kwarg", "kwparam",
    "return", "returns", "raise", "raises", "except", "exception", "see",
    "note", "attention", "bug", "warning", "todo", "since", "version",
    "author", "organization", "copyright", "license", "contact", "summary",
    "description", "deprecated", "ivar", "cvar", "var", "group", "sort",
    "invariant", "requires", "change", "url",
];

/// Errors raised while reading contract fields from documentation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("line {line}: @{tag} needs a parameter name (@{tag} name: ...)")]
    MissingArgument { tag: String, line: usize },

    #[error("line {line}: @{tag} does not take a parameter name, found '{arg}'")]
    UnexpectedArgument {
        tag: String,
        arg: String,
        line: usize,
    },

    #[error("line {line}: @{tag} has an empty body")]
    EmptyField { tag: String, line: usize },

    #[error("line {line}: duplicate @{tag}{}", for_param(.arg))]
    Duplicate {
        tag: String,
        arg: Option<String>,
        line: usize,
    },

    #[error("line {line}: unknown field @{tag}")]
    UnknownField { tag: String, line: usize },
}

fn for_param(arg: &Option<String>) -> String {
    arg.as_ref()
        .map(|a| format!(" for '{}'", a))
        .unwrap_or_default()
}

/// The contract declared by a function's documentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDoc {
    /// Positional parameter names, in signature order.
    pub params: Vec<String>,
    /// Declared parameter types, in declaration order.
    pub param_types: Vec<(String, String)>,
    pub return_type: Option<String>,
    pub preconditions: Vec<String>,
    pub postconditions: Vec<String>,
}

impl ContractDoc {
    pub fn param_type(&self, name: &str) -> Option<&str> {
        self.param_types
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, ty)| ty.as_str())
    }

    /// Whether the documentation declares anything to check.
    pub fn is_empty(&self) -> bool {
        self.param_types.is_empty()
            && self.return_type.is_none()
            && self.preconditions.is_empty()
            && self.postconditions.is_empty()
    }
}

/// Turns a function description into its declared contract.
pub trait DocExtractor {
    fn extract(&self, def: &FunctionDef) -> Result<ContractDoc, ExtractError>;
}

/// Reads epydoc-style `@type`/`@rtype`/`@precondition`/`@postcondition`
/// fields.
#[derive(Debug, Clone, Default)]
pub struct EpydocExtractor {
    strict: bool,
}

impl EpydocExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject fields that are neither contract nor descriptive fields.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Parse `doc` into a contract for a function taking `params`.
    pub fn parse(&self, doc: &str, params: &[String]) -> Result<ContractDoc, ExtractError> {
        let mut contract = ContractDoc {
            params: params.to_vec(),
            ..ContractDoc::default()
        };
        for field in collect_fields(doc) {
            self.apply(&mut contract, field)?;
        }
        Ok(contract)
    }

    fn apply(&self, contract: &mut ContractDoc, field: Field) -> Result<(), ExtractError> {
        let Field {
            tag,
            arg,
            body,
            line,
        } = field;
        let tag_lower = tag.to_ascii_lowercase();
        match tag_lower.as_str() {
            "type" => {
                let arg = arg.ok_or_else(|| ExtractError::MissingArgument {
                    tag: tag.clone(),
                    line,
                })?;
                let body = non_empty(&tag, body, line)?;
                if contract.param_type(&arg).is_some() {
                    return Err(ExtractError::Duplicate {
                        tag,
                        arg: Some(arg),
                        line,
                    });
                }
                contract.param_types.push((arg, body));
            }
            "rtype" | "returntype" => {
                reject_argument(&tag, arg, line)?;
                let body = non_empty(&tag, body, line)?;
                if contract.return_type.is_some() {
                    return Err(ExtractError::Duplicate {
                        tag,
                        arg: None,
                        line,
                    });
                }
                contract.return_type = Some(body);
            }
            "precondition" => {
                reject_argument(&tag, arg, line)?;
                contract.preconditions.push(non_empty(&tag, body, line)?);
            }
            "postcondition" => {
                reject_argument(&tag, arg, line)?;
                contract.postconditions.push(non_empty(&tag, body, line)?);
            }
            other if DESCRIPTIVE_FIELDS.contains(&other) => {
                tracing::trace!(tag = %tag, line, "Ignoring descriptive field");
            }
            _ if self.strict => return Err(ExtractError::UnknownField { tag, line }),
            _ => {
                tracing::trace!(tag = %tag, line, "Ignoring unknown field");
            }
        }
        Ok(())
    }
}

impl DocExtractor for EpydocExtractor {
    fn extract(&self, def: &FunctionDef) -> Result<ContractDoc, ExtractError> {
        self.parse(&def.doc, &def.params)
    }
}

fn reject_argument(tag: &str, arg: Option<String>, line: usize) -> Result<(), ExtractError> {
    match arg {
        Some(arg) => Err(ExtractError::UnexpectedArgument {
            tag: tag.to_string(),
            arg,
            line,
        }),
        None => Ok(()),
    }
}

fn non_empty(tag: &str, body: String, line: usize) -> Result<String, ExtractError> {
    if body.is_empty() {
        Err(ExtractError::EmptyField {
            tag: tag.to_string(),
            line,
        })
    } else {
        Ok(body)
    }
}

/// One `@field` with its continuation lines folded in.
#[derive(Debug, Clone, PartialEq)]
struct Field {
    tag: String,
    arg: Option<String>,
    body: String,
    /// 1-based line number of the `@` line.
    line: usize,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn collect_fields(doc: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    // The open field and the indentation of its `@` line.
    let mut open: Option<(Field, usize)> = None;

    for (index, raw) in doc.lines().enumerate() {
        let trimmed = raw.trim();

        if let Some(caps) = FIELD_PATTERN.captures(trimmed) {
            if let Some((field, _)) = open.take() {
                fields.push(field);
            }
            let field = Field {
                tag: caps["tag"].to_string(),
                arg: caps.name("arg").map(|m| m.as_str().to_string()),
                body: caps["body"].trim().to_string(),
                line: index + 1,
            };
            open = Some((field, indent_of(raw)));
            continue;
        }

        match open.as_mut() {
            Some((field, indent)) if !trimmed.is_empty() && indent_of(raw) > *indent => {
                if !field.body.is_empty() {
                    field.body.push(' ');
                }
                field.body.push_str(trimmed);
            }
            _ => {
                if let Some((field, _)) = open.take() {
                    fields.push(field);
                }
            }
        }
    }

    if let Some((field, _)) = open {
        fields.push(field);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_contract() {
        let doc = r#"
        Add two numbers.

        @param a1: The first number.
        @type a1: int
        @type a2: (int, float)
        @precondition: a1 > 0
        @precondition: a2 > 0
        @rtype: (int, float)
        @postcondition: result > 0
        @postcondition: result % 2
        "#;
        let contract = EpydocExtractor::new()
            .parse(doc, &params(&["a1", "a2"]))
            .unwrap();

        assert_eq!(contract.params, params(&["a1", "a2"]));
        assert_eq!(contract.param_type("a1"), Some("int"));
        assert_eq!(contract.param_type("a2"), Some("(int, float)"));
        assert_eq!(contract.return_type.as_deref(), Some("(int, float)"));
        assert_eq!(contract.preconditions, vec!["a1 > 0", "a2 > 0"]);
        assert_eq!(contract.postconditions, vec!["result > 0", "result % 2"]);
    }

    #[test]
    fn test_continuation_lines_join() {
        let doc = "@precondition: a1 > 0 and\n    a2 > 0\n@rtype: int";
        let contract = EpydocExtractor::new().parse(doc, &[]).unwrap();
        assert_eq!(contract.preconditions, vec!["a1 > 0 and a2 > 0"]);
        assert_eq!(contract.return_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_blank_line_closes_field() {
        let doc = "@precondition: x\n\n    not a continuation";
        let contract = EpydocExtractor::new().parse(doc, &[]).unwrap();
        assert_eq!(contract.preconditions, vec!["x"]);
    }

    #[test]
    fn test_empty_documentation() {
        let contract = EpydocExtractor::new().parse("Just prose.", &[]).unwrap();
        assert!(contract.is_empty());
    }

    #[test]
    fn test_type_requires_parameter_name() {
        let err = EpydocExtractor::new().parse("@type: int", &[]).unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingArgument {
                tag: "type".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_rtype_rejects_parameter_name() {
        let err = EpydocExtractor::new()
            .parse("@rtype x: int", &[])
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedArgument { .. }));
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = EpydocExtractor::new()
            .parse("@type a: int\n@type a: str", &params(&["a"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 2: duplicate @type for 'a'"
        );
        let err = EpydocExtractor::new()
            .parse("@rtype: int\n@rtype: str", &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "line 2: duplicate @rtype");
    }

    #[test]
    fn test_empty_body_rejected() {
        let err = EpydocExtractor::new()
            .parse("@precondition:   ", &[])
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyField { line: 1, .. }));
    }

    #[test]
    fn test_unknown_fields_only_rejected_when_strict() {
        let doc = "@frobnicate: yes";
        assert!(EpydocExtractor::new().parse(doc, &[]).is_ok());
        assert!(matches!(
            EpydocExtractor::strict().parse(doc, &[]).unwrap_err(),
            ExtractError::UnknownField { .. }
        ));
    }

    #[test]
    fn test_extract_uses_function_def() {
        let def = FunctionDef::new(crate::location::ModuleInfo::new("m", "m.rs"), "f", ["a1"])
            .doc("@type a1: str");
        let contract = EpydocExtractor::new().extract(&def).unwrap();
        assert_eq!(contract.param_type("a1"), Some("str"));
    }
}
