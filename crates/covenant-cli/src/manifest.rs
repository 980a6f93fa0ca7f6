//! Contract manifests: documented functions plus recorded calls, as YAML or JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use covenant_core::{Args, CallableKind, ErrorKind, FunctionDef, ModuleInfo, Scope, TypeTag, Value};

use crate::schema;

/// Errors that can occur when loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Manifest does not match the schema:\n  {}", .0.join("\n  "))]
    SchemaError(Vec<String>),

    #[error("Unknown builtin type '{name}' for global '{global}'")]
    UnknownType { global: String, name: String },

    #[error("Duplicate function name: {0}")]
    DuplicateFunction(String),
}

/// A global binding visible to contract expressions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GlobalSpec {
    /// A builtin type such as `int` or `NoneType`.
    Type(String),
    /// A user-defined class, matched by name.
    Class(String),
    /// Any other value.
    Value(serde_json::Value),
}

impl GlobalSpec {
    fn resolve(&self, global: &str) -> Result<Value, ManifestError> {
        match self {
            GlobalSpec::Type(name) => TypeTag::builtin(name).map(Value::Type).ok_or_else(|| {
                ManifestError::UnknownType {
                    global: global.to_string(),
                    name: name.clone(),
                }
            }),
            GlobalSpec::Class(name) => Ok(Value::Type(TypeTag::Class(name.clone()))),
            GlobalSpec::Value(value) => Ok(Value::from(value.clone())),
        }
    }
}

fn resolve_scope(globals: &BTreeMap<String, GlobalSpec>) -> Result<Scope, ManifestError> {
    let mut scope = Scope::new();
    for (name, spec) in globals {
        scope.bind(name.as_str(), spec.resolve(name)?);
    }
    Ok(scope)
}

/// The module the manifest's functions are defined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub globals: BTreeMap<String, GlobalSpec>,
}

/// One recorded call of a documented function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallSpec {
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, serde_json::Value>,
    /// What the function returned; absent means `None`.
    #[serde(default)]
    pub returns: Option<serde_json::Value>,
    /// The function's own error, if it failed.
    #[serde(default)]
    pub raises: Option<String>,
    /// Globals of the calling site; the module's globals when absent.
    #[serde(default)]
    pub caller: Option<BTreeMap<String, GlobalSpec>>,
    /// The violation this call is expected to produce.
    #[serde(default)]
    pub expect: Option<ErrorKind>,
}

impl CallSpec {
    pub fn args(&self) -> Args {
        let args: Args = self.args.iter().cloned().map(Value::from).collect();
        self.kwargs
            .iter()
            .fold(args, |args, (name, value)| args.kwarg(name.as_str(), Value::from(value.clone())))
    }

    /// The recorded outcome of the function body.
    pub fn outcome(&self) -> Result<Value, String> {
        match &self.raises {
            Some(message) => Err(message.clone()),
            None => Ok(self.returns.clone().map(Value::from).unwrap_or(Value::None)),
        }
    }

    pub fn caller_scope(&self) -> Result<Option<Scope>, ManifestError> {
        self.caller.as_ref().map(resolve_scope).transpose()
    }
}

/// A documented function and its recorded calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub kind: CallableKind,
    /// Enclosing classes or functions, outermost first.
    #[serde(default)]
    pub nesting: Vec<String>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
}

/// A contract manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub module: ModuleSpec,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

impl Manifest {
    /// Load a manifest, choosing the format by file extension (`.json`,
    /// anything else is read as YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ManifestError> {
        schema::validate_manifest_schema(&value).map_err(ManifestError::SchemaError)?;
        let manifest: Manifest = serde_json::from_value(value)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = std::collections::HashSet::new();
        for function in &self.functions {
            let qualified = function
                .nesting
                .iter()
                .chain(std::iter::once(&function.name))
                .cloned()
                .collect::<Vec<_>>()
                .join(".");
            if !seen.insert(qualified.clone()) {
                return Err(ManifestError::DuplicateFunction(qualified));
            }
        }
        // Surface unknown global types at load time.
        self.module_info()?;
        Ok(())
    }

    pub fn module_info(&self) -> Result<ModuleInfo, ManifestError> {
        Ok(ModuleInfo::new(&self.module.name, &self.module.file)
            .with_globals(resolve_scope(&self.module.globals)?))
    }

    /// The [`FunctionDef`] of `function` within this manifest's module.
    pub fn function_def(&self, function: &FunctionSpec) -> Result<FunctionDef, ManifestError> {
        Ok(
            FunctionDef::new(self.module_info()?, &function.name, function.params.iter().cloned())
                .doc(function.doc.as_str())
                .kind(function.kind),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
module:
  name: geometry
  file: src/geometry.rs
  globals:
    number: {type: float}
    Point: {class: Point}
    limit: {value: 10}
functions:
  - name: scale
    params: [factor]
    nesting: [Shape]
    doc: |
      @type factor: (int, number)
      @precondition: factor < limit
    calls:
      - args: [2]
        returns: 4
      - kwargs: {factor: "x"}
        expect: argument_type
      - args: [1]
        raises: "boom"
"#;

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = Manifest::from_yaml(YAML).unwrap();
        assert_eq!(manifest.module.name, "geometry");
        let function = &manifest.functions[0];
        assert_eq!(function.nesting, vec!["Shape"]);
        assert_eq!(function.calls.len(), 3);
        assert_eq!(function.calls[1].expect, Some(ErrorKind::ArgumentType));
        assert_eq!(function.calls[2].outcome(), Err("boom".to_string()));

        let module = manifest.module_info().unwrap();
        assert_eq!(module.globals.get("number"), Some(&Value::Type(TypeTag::Float)));
        assert_eq!(
            module.globals.get("Point"),
            Some(&Value::Type(TypeTag::Class("Point".into())))
        );
        assert_eq!(module.globals.get("limit"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_call_args() {
        let call = CallSpec {
            args: vec![serde_json::json!(1)],
            kwargs: [("b".to_string(), serde_json::json!("x"))].into_iter().collect(),
            ..CallSpec::default()
        };
        let args = call.args();
        assert_eq!(args.lookup(0, "a"), Some(&Value::Int(1)));
        assert_eq!(args.lookup(1, "b"), Some(&Value::from("x")));
        assert_eq!(call.outcome(), Ok(Value::None));
    }

    #[test]
    fn test_parse_json_manifest() {
        let json = r#"{
            "module": {"name": "m", "file": "m.rs"},
            "functions": [{"name": "f", "params": ["a"], "doc": "@type a: int"}]
        }"#;
        let manifest = Manifest::from_json(json).unwrap();
        let def = manifest.function_def(&manifest.functions[0]).unwrap();
        assert_eq!(def.params, vec!["a"]);
        assert_eq!(def.kind, CallableKind::Function);
    }

    #[test]
    fn test_unknown_builtin_type_rejected() {
        let json = r#"{
            "module": {"name": "m", "file": "m.rs", "globals": {"x": {"type": "integer"}}}
        }"#;
        assert!(matches!(
            Manifest::from_json(json).unwrap_err(),
            ManifestError::UnknownType { .. }
        ));
    }

    #[test]
    fn test_schema_violations_reported() {
        let json = r#"{"module": {"name": "m"}}"#;
        assert!(matches!(
            Manifest::from_json(json).unwrap_err(),
            ManifestError::SchemaError(_)
        ));
    }

    #[test]
    fn test_duplicate_functions_rejected() {
        let json = r#"{
            "module": {"name": "m", "file": "m.rs"},
            "functions": [{"name": "f"}, {"name": "f", "nesting": ["A"]}, {"name": "f"}]
        }"#;
        match Manifest::from_json(json).unwrap_err() {
            ManifestError::DuplicateFunction(name) => assert_eq!(name, "f"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
