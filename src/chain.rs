//! Fluent-builder expressions for the generated test classes.
//!
//! Every function here is a pure translation from the typed model to
//! Python source text. Optional fields that are absent produce no call at
//! all, so `set_timeout` only appears when the document sets a timeout.

use serde_json::{Map, Value};
use tracing::trace;

use crate::assertions::Validator;
use crate::errors::{MakeError, Result};
use crate::model::{Config, ExtractionRule, Hook, RequestSpec, Step, StepKind, TestCaseRef};
use crate::pyliteral::{dq, sq, to_literal};

/// `Config("name")` followed by the configured options.
pub fn config_chain(config: &Config) -> String {
    let mut chain = format!("Config({})", dq(&config.name));
    if !config.variables.is_empty() {
        chain.push_str(&format!(".variables(**{})", map_literal(&config.variables)));
    }
    if let Some(base_url) = &config.base_url {
        chain.push_str(&format!(".base_url({})", dq(base_url)));
    }
    if let Some(verify) = config.verify {
        chain.push_str(&format!(".verify({})", py_bool(verify)));
    }
    if let Some(export) = &config.export {
        chain.push_str(&format!(".export(*{})", str_list_literal(export)));
    }
    chain
}

/// `.get("/path")` followed by the request options.
pub fn request_chain(request: &RequestSpec) -> String {
    let mut chain = format!(".{}({})", request.method.to_lowercase(), dq(&request.url));

    if let Some(params) = &request.params {
        chain.push_str(&format!(".with_params(**{})", map_literal(params)));
    }
    if let Some(headers) = &request.headers {
        chain.push_str(&format!(".with_headers(**{})", map_literal(headers)));
    }
    if let Some(cookies) = &request.cookies {
        chain.push_str(&format!(".with_cookies(**{})", map_literal(cookies)));
    }
    if let Some(data) = &request.data {
        chain.push_str(&format!(".with_data({})", body_literal(data)));
    }
    if let Some(json) = &request.json {
        chain.push_str(&format!(".with_json({})", body_literal(json)));
    }
    if let Some(timeout) = &request.timeout {
        chain.push_str(&format!(".set_timeout({})", to_literal(timeout)));
    }
    if let Some(verify) = request.verify {
        chain.push_str(&format!(".set_verify({})", py_bool(verify)));
    }
    if let Some(allow_redirects) = request.allow_redirects {
        chain.push_str(&format!(".set_allow_redirects({})", py_bool(allow_redirects)));
    }
    if let Some(upload) = &request.upload {
        chain.push_str(&format!(".upload(**{})", map_literal(upload)));
    }
    chain
}

/// `Step(RunRequest(...)...)` or `Step(RunTestCase(...).call(Cls)...)`.
///
/// Reference steps must already be compiled; an uncompiled reference is a
/// format error.
pub fn step_chain(step: &Step) -> Result<String> {
    let mut chain = match &step.kind {
        StepKind::Request(_) => format!("RunRequest({})", dq(&step.name)),
        StepKind::Reference(_) => format!("RunTestCase({})", dq(&step.name)),
    };

    if let Some(variables) = &step.variables {
        chain.push_str(&format!(".with_variables(**{})", map_literal(variables)));
    }

    if let Some(hooks) = &step.setup_hooks {
        for hook in hooks {
            chain.push_str(&hook_call("setup_hook", hook));
        }
    }

    match &step.kind {
        StepKind::Request(request) => chain.push_str(&request_chain(request)),
        StepKind::Reference(TestCaseRef::Compiled(class_name)) => {
            chain.push_str(&format!(".call({})", class_name));
        }
        StepKind::Reference(TestCaseRef::Path(path)) => {
            return Err(MakeError::format(
                format!("Unresolved testcase reference in step '{}'", step.name),
                path.clone(),
            ))
        }
    }

    if let Some(hooks) = &step.teardown_hooks {
        for hook in hooks {
            chain.push_str(&hook_call("teardown_hook", hook));
        }
    }

    if let Some(extract) = &step.extract {
        chain.push_str(".extract()");
        for (var, rule) in extract {
            chain.push_str(&match rule {
                ExtractionRule::Regex(pattern) => {
                    format!(".with_regex({}, {})", sq(pattern), sq(var))
                }
                ExtractionRule::JmesPath(expr) => {
                    format!(".with_jmespath({}, {})", sq(expr), sq(var))
                }
            });
        }
    }

    if let Some(export) = &step.export {
        chain.push_str(&format!(".export(*{})", str_list_literal(export)));
    }

    if let Some(validators) = &step.validate {
        chain.push_str(".validate()");
        for validator in validators {
            chain.push_str(&assert_call(validator));
        }
    }

    trace!("step '{}': {}", step.name, chain);
    Ok(format!("Step({})", chain))
}

fn hook_call(method: &str, hook: &Hook) -> String {
    match hook {
        Hook::Expression(expr) => format!(".{}({})", method, dq(expr)),
        Hook::Binding { var, expr } => format!(".{}({}, {})", method, dq(expr), dq(var)),
    }
}

/// `.assert_<method>(check, expect[, 'message'])`. The check is quoted with
/// single quotes when it contains a double quote, e.g. `body."user-agent"`.
fn assert_call(validator: &Validator) -> String {
    let check = if validator.check.contains('"') {
        sq(&validator.check)
    } else {
        dq(&validator.check)
    };
    let expect = body_literal(&validator.expect);
    if validator.message.is_empty() {
        format!(".assert_{}({}, {})", validator.assert_method, check, expect)
    } else {
        format!(
            ".assert_{}({}, {}, {})",
            validator.assert_method,
            check,
            expect,
            sq(&validator.message)
        )
    }
}

/// Strings are double quoted, everything else is a Python literal.
fn body_literal(value: &Value) -> String {
    match value {
        Value::String(s) => dq(s),
        other => to_literal(other),
    }
}

fn map_literal(map: &Map<String, Value>) -> String {
    to_literal(&Value::Object(map.clone()))
}

fn str_list_literal(items: &[String]) -> String {
    to_literal(&Value::Array(
        items.iter().map(|s| Value::String(s.clone())).collect(),
    ))
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}
