//! External source formatting of generated modules.
//!
//! Generated code is only roughly laid out; an external formatter (`black`
//! by default) normalizes it after the whole batch has been compiled.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;
use shell_escape::escape;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::configuration::MakeSettings;
use crate::errors::{MakeError, Result};

/// Time allowed for formatting a single file.
const FORMAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Formats generated source files in place.
pub trait SourceFormatter {
    /// Display name used in logs.
    fn name(&self) -> String;

    /// Format every file in `files`. Any failure fails the whole call.
    fn format_files(&self, files: &[PathBuf]) -> impl Future<Output = Result<()>> + Send;
}

/// Runs an installed formatter program once per file.
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    program: String,
    args: Vec<String>,
    parallel: bool,
}

impl ExternalFormatter {
    pub fn new(program: impl Into<String>, args: Vec<String>, parallel: bool) -> Self {
        Self {
            program: program.into(),
            args,
            parallel,
        }
    }

    pub fn from_settings(settings: &MakeSettings) -> Result<Self> {
        Ok(Self::new(
            settings.formatter.clone(),
            settings.formatter_arg_list()?,
            settings.parallel_format,
        ))
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| {
            MakeError::FormatterMissing(format!(
                "{} is not installed, install it with `pip install {}`",
                self.program, self.program
            ))
        })
    }

    fn use_parallel(&self, count: usize) -> bool {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.parallel && cpus > 1 && count > 1
    }

    fn command_line(&self, file: &Path) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|w| escape(w.into()).into_owned())
            .chain(std::iter::once(
                escape(file.to_string_lossy()).into_owned(),
            ))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn format_one(&self, exe: &Path, file: &Path) -> Result<()> {
        let command_line = self.command_line(file);
        debug!("Running formatter: {}", command_line);

        let result = timeout(
            FORMAT_TIMEOUT,
            Command::new(exe).args(&self.args).arg(file).output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!("Formatter failed: {}", stderr);
                Err(MakeError::formatter_failed(
                    file.display().to_string(),
                    stderr.trim().to_string(),
                ))
            }
            Ok(Err(e)) => Err(MakeError::formatter_failed(
                file.display().to_string(),
                format!("Process error: {}", e),
            )),
            Err(_) => Err(MakeError::formatter_failed(
                file.display().to_string(),
                format!("timed out after {} seconds", FORMAT_TIMEOUT.as_secs()),
            )),
        }
    }
}

impl SourceFormatter for ExternalFormatter {
    fn name(&self) -> String {
        self.program.clone()
    }

    async fn format_files(&self, files: &[PathBuf]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let exe = self.locate()?;
        info!("format {} pytest files with {}", files.len(), self.program);

        if self.use_parallel(files.len()) {
            let results = join_all(files.iter().map(|f| self.format_one(&exe, f))).await;
            results.into_iter().collect::<Result<Vec<_>>>()?;
        } else {
            for file in files {
                self.format_one(&exe, file).await?;
            }
        }
        Ok(())
    }
}

/// Leaves generated files untouched.
#[derive(Debug, Clone, Default)]
pub struct NoopFormatter;

impl SourceFormatter for NoopFormatter {
    fn name(&self) -> String {
        "none".to_string()
    }

    async fn format_files(&self, files: &[PathBuf]) -> Result<()> {
        debug!("Skipping formatting of {} files", files.len());
        Ok(())
    }
}
