//! Output paths and class identifiers for generated modules.
//!
//! Python module paths cannot contain spaces, dots or hyphens and must not
//! start with a digit, so every source path segment below the project root
//! is rewritten before it is used as a module path.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::project::ProjectRootResolver;

/// Rewrite one path segment into a legal module name.
pub fn sanitize_segment(name: &str) -> String {
    let name = match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("T{}", name),
        _ => name.to_string(),
    };
    if name.starts_with('.') {
        return name;
    }
    name.replace([' ', '.', '-'], "_")
}

/// Rewrite every segment of `abs_path` below the project root. The
/// extension is kept and lower-cased. Paths equal to the root are returned
/// unchanged.
pub fn ensure_file_abs_path_valid<R>(resolver: &R, abs_path: &Path) -> Result<PathBuf>
where
    R: ProjectRootResolver + ?Sized,
{
    let root = resolver.find_root(abs_path);
    let stem_path = abs_path.with_extension("");
    let relative = resolver.relative_to_root(&stem_path)?;
    if relative.as_os_str().is_empty() {
        return Ok(abs_path.to_path_buf());
    }

    let mut segments: Vec<String> = relative
        .iter()
        .map(|s| sanitize_segment(&s.to_string_lossy()))
        .collect();

    if let Some(ext) = abs_path.extension() {
        if let Some(last) = segments.last_mut() {
            last.push('.');
            last.push_str(&ext.to_string_lossy().to_lowercase());
        }
    }

    Ok(segments.iter().fold(root, |acc, s| acc.join(s)))
}

/// Python `str.title()` followed by removing underscores, e.g.
/// `request_with_variables` => `RequestWithVariables`.
pub fn class_name_for(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut prev_cased = false;
    for c in stem.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if cased {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else if c != '_' {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}

/// Output path of the generated module for a source document, and the
/// class identifier (without the `TestCase` prefix).
pub fn convert_testcase_path<R>(
    resolver: &R,
    abs_path: &Path,
    generated_suffix: &str,
) -> Result<(PathBuf, String)>
where
    R: ProjectRootResolver + ?Sized,
{
    let valid = ensure_file_abs_path_valid(resolver, abs_path)?;
    let stem = valid
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir = valid.parent().map(Path::to_path_buf).unwrap_or_default();
    let output = dir.join(format!("{}{}", stem, generated_suffix));
    Ok((output, class_name_for(&stem)))
}

/// Dotted module name of a generated file relative to the project root.
pub fn module_name<R>(resolver: &R, python_path: &Path) -> Result<String>
where
    R: ProjectRootResolver + ?Sized,
{
    let relative = resolver.relative_to_root(&python_path.with_extension(""))?;
    Ok(relative
        .iter()
        .map(|s| s.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("."))
}
