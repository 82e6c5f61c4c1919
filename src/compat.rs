//! Schema normalization for legacy testcase formats.
//!
//! Three document shapes are accepted and reconciled into the current one:
//!
//! - the current `config` + `teststeps` testcase;
//! - a bare API document (`name` + `request` at the top level), promoted to
//!   a one-step testcase;
//! - either of the above using deprecated field names or value shapes
//!   (`api` steps, list-style `extract`/`variables`, `content.`/`json.`
//!   JMESPath prefixes, dotted list indexes).

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::{MakeError, Result};

/// Returns true for a bare API document that lacks a `teststeps` wrapper.
pub fn is_api_document(document: &Map<String, Value>) -> bool {
    document.contains_key("request") && document.contains_key("name")
}

/// Normalize any supported document shape into the current testcase shape.
pub fn normalize(raw: Value) -> Result<Map<String, Value>> {
    let document = match raw {
        Value::Object(map) => map,
        other => {
            return Err(MakeError::format(
                "testcase",
                format!("content should be a mapping, got {}", type_name(&other)),
            ))
        }
    };

    let document = if is_api_document(&document) {
        ensure_testcase_v4_api(document)?
    } else {
        document
    };

    match document.get("config") {
        None => return Err(MakeError::format("testcase", "missing config part")),
        Some(Value::Object(_)) => {}
        Some(other) => {
            return Err(MakeError::format(
                "testcase",
                format!("config should be a mapping, got {}", other),
            ))
        }
    }

    ensure_testcase_v4(document)
}

/// Promote a bare API document into a one-step testcase. The step's
/// extracted variable names become the testcase exports.
pub fn ensure_testcase_v4_api(mut api: Map<String, Value>) -> Result<Map<String, Value>> {
    info!("convert api in v2/v3 to testcase format v4");

    let request = api
        .remove("request")
        .ok_or_else(|| MakeError::format("api", "missing request"))?;

    let mut step = Map::new();
    step.insert("request".to_string(), request);
    for (key, value) in ensure_step_attachment(&api)? {
        step.insert(key, value);
    }

    let mut config = Map::new();
    config.insert(
        "name".to_string(),
        api.get("name").cloned().unwrap_or(Value::Null),
    );
    if let Some(Value::Object(extract)) = step.get("extract") {
        let names: Vec<Value> = extract.keys().cloned().map(Value::String).collect();
        if !names.is_empty() {
            config.insert("export".to_string(), Value::Array(names));
        }
    }

    let mut testcase = Map::new();
    testcase.insert("config".to_string(), Value::Object(config));
    testcase.insert("teststeps".to_string(), Value::Array(vec![Value::Object(step)]));
    Ok(testcase)
}

/// Rewrite every step of a testcase into the current step shape.
pub fn ensure_testcase_v4(mut testcase: Map<String, Value>) -> Result<Map<String, Value>> {
    debug!("ensure compatibility with testcase format v2/v3");

    let config = testcase
        .remove("config")
        .ok_or_else(|| MakeError::format("testcase", "missing config part"))?;

    let steps = match testcase.remove("teststeps") {
        Some(Value::Array(steps)) => steps,
        Some(other) => {
            return Err(MakeError::format(
                "teststeps",
                format!("should be a list, got {}", type_name(&other)),
            ))
        }
        None => return Err(MakeError::format("testcase", "missing teststeps")),
    };

    let mut v4_steps = Vec::with_capacity(steps.len());
    for step in steps {
        let mut step = match step {
            Value::Object(map) => map,
            other => return Err(MakeError::format("Invalid teststep", other.to_string())),
        };

        let mut v4_step = Map::new();
        if let Some(request) = step.remove("request") {
            v4_step.insert("request".to_string(), request);
        } else if let Some(api) = step.remove("api") {
            v4_step.insert("testcase".to_string(), api);
        } else if let Some(reference) = step.remove("testcase") {
            v4_step.insert("testcase".to_string(), reference);
        } else {
            return Err(MakeError::format(
                "Invalid teststep",
                Value::Object(step).to_string(),
            ));
        }

        for (key, value) in ensure_step_attachment(&step)? {
            v4_step.insert(key, value);
        }
        v4_steps.push(Value::Object(v4_step));
    }

    let mut v4 = Map::new();
    v4.insert("config".to_string(), config);
    v4.insert("teststeps".to_string(), Value::Array(v4_steps));
    Ok(v4)
}

/// Copy the step attributes shared by request and reference steps,
/// converting legacy shapes on the way.
fn ensure_step_attachment(step: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut attachment = Map::new();

    let name = step
        .get("name")
        .cloned()
        .ok_or_else(|| MakeError::format("Invalid teststep", "missing name"))?;
    attachment.insert("name".to_string(), name);

    for key in ["variables", "setup_hooks", "teardown_hooks"] {
        if let Some(value) = step.get(key) {
            attachment.insert(key.to_string(), value.clone());
        }
    }

    if let Some(extract) = step.get("extract") {
        attachment.insert(
            "extract".to_string(),
            Value::Object(convert_extractors(extract)?),
        );
    }

    if let Some(export) = step.get("export") {
        attachment.insert("export".to_string(), export.clone());
    }

    if let Some(validate) = step.get("validate") {
        match validate {
            Value::Array(validators) => {
                attachment.insert(
                    "validate".to_string(),
                    Value::Array(convert_validators(validators.clone())?),
                );
            }
            other => {
                return Err(MakeError::format(
                    "Invalid teststep",
                    format!("validate should be a list, got {}", other),
                ))
            }
        }
    }

    Ok(attachment)
}

/// Convert legacy list-style variables into a mapping.
///
/// `[{"var1": 1}, {"var2": 2}]` becomes `{"var1": 1, "var2": 2}`.
pub fn convert_variables(raw: &Value) -> Result<Map<String, Value>> {
    match raw {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::Array(items) => {
            let mut variables = Map::new();
            for item in items {
                match item {
                    Value::Object(entry) if entry.len() == 1 => {
                        for (k, v) in entry {
                            variables.insert(k.clone(), v.clone());
                        }
                    }
                    other => {
                        return Err(MakeError::format(
                            "Invalid variables",
                            format!("list item should be a single-key mapping, got {}", other),
                        ))
                    }
                }
            }
            Ok(variables)
        }
        Value::String(s) => Err(MakeError::format(
            "Invalid variables",
            format!("variables computed by function call are not supported: {}", s),
        )),
        other => Err(MakeError::format("Invalid variables", other.to_string())),
    }
}

/// Rewrite a legacy JMESPath expression into the current syntax.
pub fn convert_jmespath(raw: &str) -> Result<String> {
    let raw = if let Some(rest) = raw.strip_prefix("content") {
        format!("body{}", rest)
    } else if let Some(rest) = raw.strip_prefix("json") {
        format!("body{}", rest)
    } else {
        raw.to_string()
    };

    let mut parts: Vec<String> = Vec::new();
    for item in raw.split('.') {
        if item.contains('-') {
            parts.push(format!("\"{}\"", item.trim_matches('"')));
        } else if !item.is_empty() && item.chars().all(|c| c.is_ascii_digit()) {
            let last = parts
                .pop()
                .ok_or_else(|| MakeError::format("Invalid jmespath", raw.clone()))?;
            parts.push(format!("{}[{}]", last, item));
        } else {
            parts.push(item.to_string());
        }
    }
    Ok(parts.join("."))
}

/// Convert list-style extractors into an ordered mapping and rewrite their
/// JMESPath expressions. Regex extractors are left untouched.
pub fn convert_extractors(extractors: &Value) -> Result<Map<String, Value>> {
    let mut converted = Map::new();
    match extractors {
        Value::Object(map) => {
            for (k, v) in map {
                converted.insert(k.clone(), v.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => {
                        for (k, v) in map {
                            converted.insert(k.clone(), v.clone());
                        }
                    }
                    other => {
                        return Err(MakeError::format(
                            "Invalid extractor",
                            format!("should be a mapping, got {}", other),
                        ))
                    }
                }
            }
        }
        other => {
            return Err(MakeError::format(
                "Invalid extractor",
                format!("should be a list or mapping, got {}", other),
            ))
        }
    }

    for (name, expr) in converted.iter_mut() {
        let raw = expr.as_str().ok_or_else(|| {
            MakeError::format("Invalid extractor", format!("{}: {}", name, expr))
        })?;
        if !raw.starts_with(crate::model::REGEX_PREFIX) {
            let converted = convert_jmespath(raw)?;
            *expr = Value::String(converted);
        }
    }
    Ok(converted)
}

/// Rewrite the check expression of each validator, in both the
/// `{check, expect}` and `{comparator: [check, expect]}` forms.
pub fn convert_validators(validators: Vec<Value>) -> Result<Vec<Value>> {
    let mut converted = Vec::with_capacity(validators.len());
    for mut validator in validators {
        if let Value::Object(map) = &mut validator {
            if map.contains_key("check") && map.contains_key("expect") {
                if let Some(Value::String(check)) = map.get("check") {
                    let check = convert_jmespath(check)?;
                    map.insert("check".to_string(), Value::String(check));
                }
            } else if map.len() == 1 {
                if let Some(Value::Array(values)) = map.values_mut().next() {
                    if let Some(Value::String(check)) = values.first() {
                        let check = convert_jmespath(check)?;
                        values[0] = Value::String(check);
                    }
                }
            }
        }
        converted.push(validator);
    }
    Ok(converted)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
