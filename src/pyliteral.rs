//! Python literal rendering for structured testcase values.
//!
//! Generated code embeds YAML/JSON values directly as Python source, so a
//! mapping such as `{x: 1, ok: true}` must come out as `{'x': 1, 'ok': True}`.
//! Strings follow `repr()` rules: single quotes unless the text contains a
//! single quote and no double quote.

use serde_json::Value;

/// Render a value as a Python literal.
pub fn to_literal(value: &Value) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => out.push_str(&number_literal(n)),
        Value::String(s) => out.push_str(&repr_str(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&repr_str(key));
                out.push_str(": ");
                write_literal(out, item);
            }
            out.push('}');
        }
    }
}

fn number_literal(n: &serde_json::Number) -> String {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.is_nan() {
            return "float('nan')".to_string();
        }
        if f.is_infinite() {
            return if f > 0.0 { "float('inf')" } else { "float('-inf')" }.to_string();
        }
        let text = f.to_string();
        // Python keeps a trailing `.0` on integral floats
        if text.contains(['.', 'e', 'E']) {
            return text;
        }
        return format!("{}.0", text);
    }
    n.to_string()
}

/// `repr()` of a Python `str`.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    quote_with(s, quote)
}

/// Quote `s` with the given quote character, escaping backslashes, the quote
/// itself and control characters so the literal evaluates back to `s`.
pub fn quote_with(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Double-quoted Python string literal.
pub fn dq(s: &str) -> String {
    quote_with(s, '"')
}

/// Single-quoted Python string literal.
pub fn sq(s: &str) -> String {
    quote_with(s, '\'')
}

/// True when `s` can be used verbatim as a Python attribute or decorator
/// name. Only ASCII identifiers are accepted.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
