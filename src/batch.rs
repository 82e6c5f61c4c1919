//! Batch driver: compile every testcase under a list of paths.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::compat::is_api_document;
use crate::errors::{MakeError, Result};
use crate::formatter::SourceFormatter;
use crate::loader::{load_folder_files, load_test_file};
use crate::maker::Maker;
use crate::project::normalize_path;

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MakeReport {
    /// Files to pass to the test runner.
    pub run_set: Vec<PathBuf>,
    /// Every module generated, including referenced ones.
    pub generated: Vec<PathBuf>,
    /// Documents that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Compile all testcases under `tests_paths`, format the generated files and
/// return the report. Relative paths are taken from the working directory.
/// An existing `output_dir` is wiped first; it must not contain any input.
pub async fn main_make<F>(
    maker: &mut Maker,
    tests_paths: &[PathBuf],
    output_dir: Option<&Path>,
    formatter: &F,
) -> Result<MakeReport>
where
    F: SourceFormatter + ?Sized,
{
    let mut report = MakeReport::default();
    if tests_paths.is_empty() {
        return Ok(report);
    }

    let cwd = std::env::current_dir()?;
    let absolute = |path: &Path| normalize_path(&cwd.join(path));
    let tests_paths: Vec<PathBuf> = tests_paths.iter().map(|p| absolute(p)).collect();
    let output_dir = output_dir.map(|dir| absolute(dir));

    if let Some(dir) = output_dir.as_deref() {
        if let Some(input) = tests_paths.iter().find(|p| p.starts_with(dir)) {
            return Err(MakeError::Params(format!(
                "output directory {} would remove input {}",
                dir.display(),
                input.display()
            )));
        }
        if dir.is_dir() {
            info!("Removing existing output directory {}", dir.display());
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
    }

    for tests_path in &tests_paths {
        if let Err(e) = make_tests_path(maker, tests_path, output_dir.as_deref(), &mut report) {
            error!("{}", e);
            return Err(e);
        }
    }

    report.generated = maker.made_files().cloned().collect();
    info!(
        "formatting {} generated files with {}",
        report.generated.len(),
        formatter.name()
    );
    formatter.format_files(&report.generated).await?;
    report.run_set = maker.run_set().iter().cloned().collect();
    Ok(report)
}

/// Compile one file or folder argument.
pub fn make_tests_path(
    maker: &mut Maker,
    tests_path: &Path,
    output_dir: Option<&Path>,
    report: &mut MakeReport,
) -> Result<()> {
    let suffix = maker.settings().generated_suffix.clone();
    let test_files = if tests_path.is_dir() {
        load_folder_files(tests_path, &suffix)
    } else if tests_path.is_file() {
        vec![tests_path.to_path_buf()]
    } else {
        return Err(MakeError::TestcaseNotFound(format!(
            "Invalid tests path: {}",
            tests_path.display()
        )));
    };

    for test_file in test_files {
        if test_file
            .to_string_lossy()
            .to_lowercase()
            .ends_with(&suffix.to_lowercase())
        {
            maker.add_to_run_set(test_file);
            continue;
        }

        let content = match load_test_file(&test_file) {
            Ok(content) => content,
            Err(e) if e.is_load_error() => {
                warn!("Invalid test file: {}\n{}", test_file.display(), e);
                report.skipped.push((test_file, e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(reason) = unusable_document(&content) {
            warn!("{}: {}", reason, test_file.display());
            report.skipped.push((test_file, reason.to_string()));
            continue;
        }

        match maker.make_testcase(content, &test_file, output_dir) {
            Ok(python_path) => maker.add_to_run_set(python_path),
            Err(e) if e.is_recoverable() => {
                warn!("Invalid testcase file: {}\n{}", test_file.display(), e);
                report.skipped.push((test_file, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reason a loaded document cannot be compiled, if any.
fn unusable_document(content: &Value) -> Option<&'static str> {
    let map = match content.as_object() {
        Some(map) => map,
        None => return Some("Invalid content, should be a mapping"),
    };
    if is_api_document(map) {
        return None;
    }
    match map.get("config") {
        None => Some("Invalid testcase file, missing config"),
        Some(Value::Object(_)) => None,
        Some(_) => Some("Invalid testcase file, config should be a mapping"),
    }
}
