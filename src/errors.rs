//! Error types for hrmake.
//!
//! Every stage of the make pipeline (loading, normalizing, compiling,
//! emitting, formatting) reports failures through [`MakeError`]. The batch
//! driver uses [`MakeError::is_recoverable`] to decide whether a failing
//! testcase is skipped or aborts the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for hrmake operations.
#[derive(Debug, Error)]
pub enum MakeError {
    /// Malformed or semantically invalid testcase document or step
    #[error("Invalid testcase format: {0}")]
    Format(String),

    /// A file or folder argument that does not point at any testcase
    #[error("Testcase not found: {0}")]
    TestcaseNotFound(String),

    /// Testcase file missing on disk
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Testcase file exists but cannot be parsed
    #[error("Invalid file format: {0}")]
    FileFormat(String),

    /// Invalid path or parameter passed into the pipeline
    #[error("Invalid parameter: {0}")]
    Params(String),

    /// A testcase that (transitively) references itself
    #[error("Cyclic testcase reference: {}", format_cycle(.0))]
    CyclicReference(Vec<PathBuf>),

    /// Two different testcases would generate the same class in one directory
    #[error("Class name collision: {0}")]
    IdentifierCollision(String),

    /// Template rendering or parsing errors
    #[error("Template error: {0}")]
    Template(String),

    /// File I/O operation failures
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// The external formatter exited unsuccessfully
    #[error("Formatter failed: {0}")]
    FormatterFailed(String),

    /// The external formatter is not installed
    #[error("Missing dependency tool: {0}")]
    FormatterMissing(String),

    /// Settings could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

/// A type alias for Results that use MakeError.
pub type Result<T> = std::result::Result<T, MakeError>;

fn format_cycle(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl MakeError {
    /// Creates a new Format error describing an offending value.
    pub fn format<S1, S2>(what: S1, detail: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        MakeError::Format(format!("{}: {}", what.into(), detail.into()))
    }

    /// Creates a new FileFormat error for a document path.
    pub fn file_format<S: Into<String>>(path: &std::path::Path, reason: S) -> Self {
        MakeError::FileFormat(format!("{}: {}", path.display(), reason.into()))
    }

    /// Creates a new FormatterFailed error with context.
    pub fn formatter_failed<S1, S2>(file: S1, details: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        MakeError::FormatterFailed(format!("{}: {}", file.into(), details.into()))
    }

    /// Returns true if the batch driver may skip the offending testcase and
    /// continue with the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MakeError::Format(_) | MakeError::IdentifierCollision(_)
        )
    }

    /// Returns true for loader-level errors on a discovered document.
    pub fn is_load_error(&self) -> bool {
        matches!(self, MakeError::FileNotFound(_) | MakeError::FileFormat(_))
    }

    /// Returns the error category as a string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            MakeError::Format(_) => "format",
            MakeError::TestcaseNotFound(_) => "testcase_not_found",
            MakeError::FileNotFound(_) => "file_not_found",
            MakeError::FileFormat(_) => "file_format",
            MakeError::Params(_) => "params",
            MakeError::CyclicReference(_) => "cyclic_reference",
            MakeError::IdentifierCollision(_) => "identifier_collision",
            MakeError::Template(_) => "template",
            MakeError::Io(_) => "io",
            MakeError::FormatterFailed(_) => "formatter_failed",
            MakeError::FormatterMissing(_) => "formatter_missing",
            MakeError::Config(_) => "config",
        }
    }
}

impl From<tera::Error> for MakeError {
    fn from(err: tera::Error) -> Self {
        MakeError::Template(err.to_string())
    }
}

impl From<config::ConfigError> for MakeError {
    fn from(err: config::ConfigError) -> Self {
        MakeError::Config(anyhow::Error::from(err))
    }
}
