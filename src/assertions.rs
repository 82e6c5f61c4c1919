//! Uniform validator records.
//!
//! Validators appear in two shapes in testcase files:
//!
//! ```yaml
//! validate:
//!   - {check: status_code, assert: equals, expect: 200, message: ok}
//!   - eq: [status_code, 200, "optional message"]
//! ```
//!
//! Both are reduced to one [`Validator`] whose `assert_method` is the
//! long-form comparator name used by the generated `assert_<method>` call.

use serde_json::Value;

use crate::errors::{MakeError, Result};
use crate::pyliteral::is_identifier;

/// A validator in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    pub assert_method: String,
    pub check: String,
    pub expect: Value,
    pub message: String,
}

/// Map comparator aliases onto their long names, e.g. `eq` => `equal`.
/// Unknown comparators are passed through unchanged.
pub fn uniform_comparator(comparator: &str) -> String {
    let uniform = match comparator {
        "eq" | "equals" | "equal" => "equal",
        "lt" | "less_than" => "less_than",
        "le" | "less_or_equals" => "less_or_equals",
        "gt" | "greater_than" => "greater_than",
        "ge" | "greater_or_equals" => "greater_or_equals",
        "ne" | "not_equal" => "not_equal",
        "str_eq" | "string_equals" => "string_equals",
        "len_eq" | "length_equal" => "length_equal",
        "len_gt" | "length_greater_than" => "length_greater_than",
        "len_ge" | "length_greater_or_equals" => "length_greater_or_equals",
        "len_lt" | "length_less_than" => "length_less_than",
        "len_le" | "length_less_or_equals" => "length_less_or_equals",
        other => other,
    };
    uniform.to_string()
}

/// Reduce a raw validator record to a [`Validator`].
pub fn uniform_validator(raw: &Value) -> Result<Validator> {
    let map = raw
        .as_object()
        .ok_or_else(|| invalid(raw, "should be a mapping"))?;

    let (comparator, check, expect, message) =
        if map.contains_key("check") && map.contains_key("expect") {
            let comparator = map
                .get("assert")
                .or_else(|| map.get("comparator"))
                .map(|c| c.as_str().ok_or_else(|| invalid(raw, "comparator should be a string")))
                .transpose()?
                .unwrap_or("eq");
            let message = match map.get("message") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            (comparator, &map["check"], map["expect"].clone(), message)
        } else if map.len() == 1 {
            let (comparator, values) = map.iter().next().ok_or_else(|| invalid(raw, "empty"))?;
            let values = match values {
                Value::Array(values) if values.len() == 2 || values.len() == 3 => values,
                _ => return Err(invalid(raw, "expected [check, expect] or [check, expect, message]")),
            };
            let message = match values.get(2) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            (comparator.as_str(), &values[0], values[1].clone(), message)
        } else {
            return Err(invalid(raw, "unknown validator shape"));
        };

    let check = check
        .as_str()
        .ok_or_else(|| invalid(raw, "check should be a string"))?
        .to_string();

    let assert_method = uniform_comparator(comparator);
    if !is_identifier(&assert_method) {
        return Err(invalid(raw, "comparator should be an identifier"));
    }

    Ok(Validator {
        assert_method,
        check,
        expect,
        message,
    })
}

fn invalid(raw: &Value, reason: &str) -> MakeError {
    MakeError::format("Invalid validator", format!("{} ({})", raw, reason))
}
