//! Property-based tests for hrmake
//!
//! These tests use the `proptest` crate to check the path sanitizer, class
//! naming and Python literal rendering over generated inputs.

use std::path::{Path, PathBuf};

use hrmake::paths::{class_name_for, ensure_file_abs_path_valid, sanitize_segment};
use hrmake::project::FixedRootResolver;
use hrmake::pyliteral::{dq, sq, to_literal};
use proptest::prelude::*;
use serde_json::Value;

/// Undo the escaping done by `quote_with` for a literal quoted with `quote`.
fn unquote(literal: &str, quote: char) -> Option<String> {
    let inner = literal.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == quote {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            q if q == quote => out.push(q),
            _ => return None,
        }
    }
    Some(out)
}

proptest! {
    #[test]
    fn sanitized_segments_are_stable(name in "[a-zA-Z0-9 ._-]{1,20}") {
        let once = sanitize_segment(&name);
        prop_assert_eq!(sanitize_segment(&once), once.clone());
    }

    #[test]
    fn sanitized_segments_are_module_names(name in "[a-zA-Z0-9 _-][a-zA-Z0-9 ._-]{0,19}") {
        let segment = sanitize_segment(&name);
        prop_assert!(!segment.starts_with(|c: char| c.is_ascii_digit()));
        prop_assert!(!segment.contains([' ', '.', '-']));
    }

    #[test]
    fn sanitized_paths_are_idempotent(
        dirs in prop::collection::vec("[a-zA-Z0-9 ._-]{1,12}", 0..3),
        stem in "[a-zA-Z0-9 _-]{1,12}",
        ext in "(yml|YAML|json)",
    ) {
        let resolver = FixedRootResolver(PathBuf::from("/project"));
        let mut path = PathBuf::from("/project");
        for dir in &dirs {
            // `.` and `..` would be taken as path components
            prop_assume!(dir.trim_matches('.') != "");
            path.push(dir);
        }
        path.push(format!("{}.{}", stem, ext));

        let once = ensure_file_abs_path_valid(&resolver, &path).unwrap();
        let twice = ensure_file_abs_path_valid(&resolver, &once).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.starts_with(Path::new("/project")));
    }

    #[test]
    fn class_names_are_identifiers(stem in "[a-zA-Z][a-zA-Z0-9_]{0,30}") {
        let class_name = class_name_for(&stem);
        prop_assert!(!class_name.is_empty());
        prop_assert!(class_name.chars().all(|c| c.is_ascii_alphanumeric()));
        prop_assert!(class_name.starts_with(|c: char| c.is_ascii_uppercase()));
    }

    #[test]
    fn quoted_strings_unescape_to_input(s in "\\PC{0,40}|[\"'\\\\\n\t\r\u{1}]{0,10}") {
        prop_assert_eq!(unquote(&dq(&s), '"'), Some(s.clone()));
        prop_assert_eq!(unquote(&sq(&s), '\''), Some(s.clone()));
    }

    #[test]
    fn string_literals_have_single_line(s in "\\PC{0,40}|[\\n\\r]{1,5}") {
        let literal = to_literal(&Value::String(s));
        prop_assert!(!literal.contains('\n'));
        prop_assert!(!literal.contains('\r'));
    }
}
