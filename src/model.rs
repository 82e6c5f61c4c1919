//! Typed testcase model.
//!
//! [`TestCase::from_document`] is the schema validation step: it turns a
//! normalized document into typed records and rejects anything the code
//! synthesizer could not render faithfully. Hooks, extractors and
//! validators are resolved into tagged variants here, once.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::assertions::{uniform_validator, Validator};
use crate::compat::convert_variables;
use crate::errors::{MakeError, Result};
use crate::pyliteral::is_identifier;

/// Prefix marking a regex extractor.
pub const REGEX_PREFIX: &str = "regex:";

/// HTTP methods accepted in a request step.
const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub config: Config,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub name: String,
    pub variables: Map<String, Value>,
    pub base_url: Option<String>,
    pub verify: Option<bool>,
    pub export: Option<Vec<String>>,
    /// Skip reason; `Some` means the generated test is skipped.
    pub skip: Option<String>,
    pub marks: Option<Vec<String>>,
    pub parameters: Option<Value>,
    /// Absolute path of the source document.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub variables: Option<Map<String, Value>>,
    pub setup_hooks: Option<Vec<Hook>>,
    pub teardown_hooks: Option<Vec<Hook>>,
    pub extract: Option<Vec<(String, ExtractionRule)>>,
    pub export: Option<Vec<String>>,
    pub validate: Option<Vec<Validator>>,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Request(RequestSpec),
    Reference(TestCaseRef),
}

/// Target of a reference step.
#[derive(Debug, Clone, PartialEq)]
pub enum TestCaseRef {
    /// Path as written in the document, not yet compiled.
    Path(String),
    /// Class name of the compiled testcase.
    Compiled(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    pub params: Option<Map<String, Value>>,
    pub headers: Option<Map<String, Value>>,
    pub cookies: Option<Map<String, Value>>,
    pub data: Option<Value>,
    pub json: Option<Value>,
    pub timeout: Option<Value>,
    pub verify: Option<bool>,
    pub allow_redirects: Option<bool>,
    pub upload: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Hook {
    /// `${func()}`
    Expression(String),
    /// `{var: ${func()}}`, the hook result is bound to `var`.
    Binding { var: String, expr: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionRule {
    Regex(String),
    JmesPath(String),
}

impl ExtractionRule {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => ExtractionRule::Regex(pattern.to_string()),
            None => ExtractionRule::JmesPath(raw.to_string()),
        }
    }
}

impl Hook {
    fn from_value(value: &Value, kind: &str) -> Result<Self> {
        match value {
            Value::String(expr) => Ok(Hook::Expression(expr.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (var, expr) = map
                    .iter()
                    .next()
                    .ok_or_else(|| MakeError::format(format!("Invalid {}", kind), value.to_string()))?;
                match expr {
                    Value::String(expr) => Ok(Hook::Binding {
                        var: var.clone(),
                        expr: expr.clone(),
                    }),
                    _ => Err(MakeError::format(format!("Invalid {}", kind), value.to_string())),
                }
            }
            _ => Err(MakeError::format(format!("Invalid {}", kind), value.to_string())),
        }
    }
}

impl TestCase {
    /// Build a testcase from a normalized document. `path` is the absolute
    /// path of the source file.
    pub fn from_document(document: &Map<String, Value>, path: PathBuf) -> Result<Self> {
        let config = match document.get("config") {
            Some(Value::Object(config)) => Config::from_map(config, path)?,
            _ => return Err(MakeError::format("testcase", "missing config part")),
        };

        let steps = match document.get("teststeps") {
            Some(Value::Array(steps)) => steps
                .iter()
                .map(Step::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(MakeError::format("testcase", "missing teststeps")),
        };

        Ok(TestCase { config, steps })
    }

    /// True if any step references another testcase.
    pub fn has_reference(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.kind, StepKind::Reference(_)))
    }
}

impl Config {
    fn from_map(map: &Map<String, Value>, path: PathBuf) -> Result<Self> {
        let name = required_str(map, "name", "config")?;
        let variables = convert_variables(map.get("variables").unwrap_or(&Value::Null))?;

        let skip = match map.get("skip") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => Some(String::new()),
            Some(Value::String(reason)) => Some(reason.clone()),
            Some(Value::Object(skip)) => Some(
                skip.get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Some(other) => return Err(MakeError::format("Invalid config skip", other.to_string())),
        };

        let parameters = match map.get("parameters") {
            None | Some(Value::Null) => None,
            Some(p @ Value::Object(_)) => Some(p.clone()),
            Some(other) => {
                return Err(MakeError::format(
                    "Invalid config parameters",
                    other.to_string(),
                ))
            }
        };

        let marks = optional_str_list(map, "marks", "config")?;
        if let Some(bad) = marks.iter().flatten().find(|m| !is_identifier(m)) {
            return Err(MakeError::format(
                "Invalid config marks",
                format!("'{}' is not a valid pytest mark name", bad),
            ));
        }

        Ok(Config {
            name,
            variables,
            base_url: optional_str(map, "base_url", "config")?,
            verify: optional_bool(map, "verify", "config")?,
            export: optional_str_list(map, "export", "config")?,
            skip,
            marks,
            parameters,
            path,
        })
    }
}

impl Step {
    fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| MakeError::format("Invalid teststep", value.to_string()))?;
        let name = required_str(map, "name", "teststep")?;
        let context = format!("teststep '{}'", name);

        let kind = if let Some(request) = map.get("request").filter(|r| !r.is_null()) {
            StepKind::Request(RequestSpec::from_value(request, &context)?)
        } else if let Some(reference) = map.get("testcase") {
            match reference {
                Value::String(path) if !path.is_empty() => {
                    StepKind::Reference(TestCaseRef::Path(path.clone()))
                }
                other => {
                    return Err(MakeError::format(
                        format!("Invalid {} testcase reference", context),
                        other.to_string(),
                    ))
                }
            }
        } else {
            return Err(MakeError::format("Invalid teststep", value.to_string()));
        };

        let variables = match map.get("variables") {
            None => None,
            Some(v) => Some(convert_variables(v)?),
        };

        let extract = match map.get("extract") {
            None => None,
            Some(Value::Object(rules)) => Some(
                rules
                    .iter()
                    .map(|(var, raw)| {
                        raw.as_str()
                            .map(|raw| (var.clone(), ExtractionRule::parse(raw)))
                            .ok_or_else(|| {
                                MakeError::format(
                                    format!("Invalid {} extractor", context),
                                    format!("{}: {}", var, raw),
                                )
                            })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(MakeError::format(
                    format!("Invalid {} extract", context),
                    other.to_string(),
                ))
            }
        };

        let validate = match map.get("validate") {
            None => None,
            Some(Value::Array(validators)) => Some(
                validators
                    .iter()
                    .map(uniform_validator)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(MakeError::format(
                    format!("Invalid {} validate", context),
                    other.to_string(),
                ))
            }
        };

        Ok(Step {
            variables,
            setup_hooks: hooks(map, "setup_hooks", "setup hook")?,
            teardown_hooks: hooks(map, "teardown_hooks", "teardown hook")?,
            extract,
            export: optional_str_list(map, "export", &context)?,
            validate,
            kind,
            name,
        })
    }
}

impl RequestSpec {
    fn from_value(value: &Value, context: &str) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            MakeError::format(format!("Invalid {} request", context), value.to_string())
        })?;

        let method = required_str(map, "method", context)?.to_uppercase();
        if !HTTP_METHODS.contains(&method.as_str()) {
            return Err(MakeError::format(
                format!("Invalid {} request method", context),
                method,
            ));
        }

        let timeout = match map.get("timeout") {
            None => None,
            Some(t @ Value::Number(_)) => Some(t.clone()),
            Some(other) => {
                return Err(MakeError::format(
                    format!("Invalid {} request timeout", context),
                    other.to_string(),
                ))
            }
        };

        Ok(RequestSpec {
            method,
            url: required_str(map, "url", context)?,
            params: optional_map(map, "params", context)?,
            headers: optional_map(map, "headers", context)?,
            cookies: optional_map(map, "cookies", context)?,
            data: map.get("data").cloned(),
            json: map.get("json").cloned(),
            timeout,
            verify: optional_bool(map, "verify", context)?,
            allow_redirects: optional_bool(map, "allow_redirects", context)?,
            upload: optional_map(map, "upload", context)?,
        })
    }
}

fn hooks(map: &Map<String, Value>, key: &str, kind: &str) -> Result<Option<Vec<Hook>>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| Hook::from_value(item, kind))
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(MakeError::format(format!("Invalid {}s", kind), other.to_string())),
    }
}

fn required_str(map: &Map<String, Value>, key: &str, context: &str) -> Result<String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(MakeError::format(
            format!("Invalid {} {}", context, key),
            format!("should be a string, got {}", other),
        )),
        None => Err(MakeError::format(
            format!("Invalid {}", context),
            format!("missing {}", key),
        )),
    }
}

fn optional_str(map: &Map<String, Value>, key: &str, context: &str) -> Result<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(MakeError::format(
            format!("Invalid {} {}", context, key),
            format!("should be a string, got {}", other),
        )),
    }
}

fn optional_bool(map: &Map<String, Value>, key: &str, context: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(MakeError::format(
            format!("Invalid {} {}", context, key),
            format!("should be a bool, got {}", other),
        )),
    }
}

fn optional_map(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<Map<String, Value>>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Object(m)) => Ok(Some(m.clone())),
        Some(other) => Err(MakeError::format(
            format!("Invalid {} {}", context, key),
            format!("should be a mapping, got {}", other),
        )),
    }
}

fn optional_str_list(
    map: &Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<Vec<String>>> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    MakeError::format(
                        format!("Invalid {} {}", context, key),
                        format!("items should be strings, got {}", item),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(MakeError::format(
            format!("Invalid {} {}", context, key),
            format!("should be a list, got {}", other),
        )),
    }
}
