//! Settings for the make pipeline.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional `hrmake.toml`, then `HRMAKE_*` environment variables
//! (for example `HRMAKE_FORMATTER=ruff`, `HRMAKE_PARALLEL_FORMAT=false`).

use std::path::Path;

use anyhow::Context;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use validator::Validate;

use crate::errors::Result;

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "hrmake.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "HRMAKE";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Builder, Validate)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct MakeSettings {
    /// Executable used to format generated files.
    #[validate(length(min = 1, message = "formatter must not be empty"))]
    pub formatter: String,
    /// Extra arguments passed to the formatter, split with shell rules.
    pub formatter_args: String,
    /// Format files concurrently when the host supports it.
    pub parallel_format: bool,
    /// File that marks the project root directory.
    #[validate(length(min = 1, message = "project root marker must not be empty"))]
    pub root_marker: String,
    /// Suffix appended to generated pytest file stems.
    #[validate(length(min = 4, message = "generated suffix must end in a file extension"))]
    pub generated_suffix: String,
    /// File created in each output directory so it is importable.
    #[validate(length(min = 1, message = "package marker must not be empty"))]
    pub package_marker: String,
    /// Version written into the banner of generated files.
    pub runner_version: String,
}

impl Default for MakeSettings {
    fn default() -> Self {
        MakeSettings {
            formatter: "black".to_string(),
            formatter_args: String::new(),
            parallel_format: true,
            root_marker: "debugtalk.py".to_string(),
            generated_suffix: "_test.py".to_string(),
            package_marker: "__init__.py".to_string(),
            runner_version: "v4.3.5".to_string(),
        }
    }
}

impl MakeSettings {
    /// Load settings from defaults, an optional settings file and the
    /// environment. A missing file is not an error.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = MakeSettings::default();
        let mut builder = config::Config::builder()
            .set_default("formatter", defaults.formatter.clone())?
            .set_default("formatter_args", defaults.formatter_args.clone())?
            .set_default("parallel_format", defaults.parallel_format)?
            .set_default("root_marker", defaults.root_marker.clone())?
            .set_default("generated_suffix", defaults.generated_suffix.clone())?
            .set_default("package_marker", defaults.package_marker.clone())?
            .set_default("runner_version", defaults.runner_version.clone())?;

        let file = file.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
        debug!("Loading settings from: {}", file.display());
        builder = builder.add_source(config::File::from(file).required(false));
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));

        let settings: MakeSettings = builder.build()?.try_deserialize()?;
        settings
            .validate()
            .context("Settings validation failed")?;
        trace!("{:?}", settings);
        Ok(settings)
    }

    /// Formatter arguments split into words.
    pub fn formatter_arg_list(&self) -> Result<Vec<String>> {
        if self.formatter_args.trim().is_empty() {
            return Ok(Vec::new());
        }
        shlex::split(&self.formatter_args).ok_or_else(|| {
            crate::errors::MakeError::Config(anyhow::anyhow!(
                "Invalid formatter arguments: {}",
                self.formatter_args
            ))
        })
    }
}
