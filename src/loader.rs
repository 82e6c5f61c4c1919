//! Loading testcase documents from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::errors::{MakeError, Result};

/// Extensions recognised as testcase documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Load a YAML or JSON testcase file into an untyped document.
pub fn load_test_file(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(MakeError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes)
        .map_err(|e| MakeError::file_format(path, format!("not valid UTF-8: {}", e)))?;
    let document: Value = match extension.as_str() {
        "json" => serde_json::from_str(&content)
            .map_err(|e| MakeError::file_format(path, format!("JSON format error: {}", e)))?,
        "yml" | "yaml" => serde_yaml::from_str(&content)
            .map_err(|e| MakeError::file_format(path, format!("YAML format error: {}", e)))?,
        _ => {
            return Err(MakeError::file_format(
                path,
                "testcase file should be YAML/JSON format",
            ))
        }
    };

    if is_empty_document(&document) {
        return Err(MakeError::file_format(path, "testcase file content is empty"));
    }

    trace!("Loaded {}: {}", path.display(), document);
    Ok(document)
}

fn is_empty_document(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Returns true if `path` names a testcase document or a generated file.
pub fn is_candidate_file(path: &Path, generated_suffix: &str) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_lowercase(),
        None => return false,
    };
    if name.ends_with(&generated_suffix.to_lowercase()) {
        return true;
    }
    DOCUMENT_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{}", ext)))
}

/// Recursively collect testcase documents and previously generated files
/// under `folder`, in a stable order.
pub fn load_folder_files(folder: &Path, generated_suffix: &str) -> Vec<PathBuf> {
    if !folder.exists() {
        warn!("Folder does not exist: {}", folder.display());
        return Vec::new();
    }

    let files: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_candidate_file(p, generated_suffix))
        .collect();

    debug!("Found {} files in {}", files.len(), folder.display());
    files
}
