//! Rendering and writing generated pytest modules.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::errors::{MakeError, Result};

const TESTCASE_TEMPLATE: &str = "testcase.py";

/// Content written into package markers created next to generated files.
pub const PACKAGE_MARKER_CONTENT: &str = "# NOTICE: Generated By HttpRunner. DO NOT EDIT!\n";

/// Everything the testcase template needs to render one module.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompiledUnit {
    pub version: String,
    /// Source document path relative to the project root.
    pub testcase_path: String,
    /// Full class name, including the `TestCase` prefix.
    pub class_name: String,
    pub imports: Vec<String>,
    pub config_chain: String,
    /// Quoted skip reason.
    pub skip: Option<String>,
    pub marks: Vec<String>,
    /// Parameters as a Python literal.
    pub parameters: Option<String>,
    pub reference_testcase: bool,
    pub teststeps: Vec<String>,
}

impl CompiledUnit {
    fn needs_pytest(&self) -> bool {
        self.parameters.is_some() || self.skip.is_some() || !self.marks.is_empty()
    }
}

/// Renders [`CompiledUnit`]s with the built-in template and writes them out.
pub struct Emitter {
    tera: Tera,
    package_marker: String,
}

impl Emitter {
    pub fn new(package_marker: impl Into<String>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            TESTCASE_TEMPLATE,
            include_str!("../templates/testcase.py.tera"),
        )?;
        tera.autoescape_on(vec![]);
        Ok(Self {
            tera,
            package_marker: package_marker.into(),
        })
    }

    pub fn render(&self, unit: &CompiledUnit) -> Result<String> {
        let mut context = Context::from_serialize(unit)?;
        context.insert("needs_pytest", &unit.needs_pytest());
        self.tera.render(TESTCASE_TEMPLATE, &context).map_err(|e| {
            MakeError::Template(format!("Failed to render {}: {}", unit.class_name, e))
        })
    }

    /// Render `unit` to `output`, creating parent directories and the
    /// package marker as needed.
    pub fn emit(&self, unit: &CompiledUnit, output: &Path) -> Result<()> {
        let content = self.render(unit)?;
        let dir = output
            .parent()
            .ok_or_else(|| MakeError::Params(format!("no parent dir: {}", output.display())))?;
        fs::create_dir_all(dir)?;

        let mut tmp = output.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, output)?;

        self.ensure_package(dir)?;
        info!("generated testcase: {}", output.display());
        Ok(())
    }

    /// Create the package marker in `dir` unless one exists.
    pub fn ensure_package(&self, dir: &Path) -> Result<()> {
        let marker = dir.join(&self.package_marker);
        if marker.is_file() {
            return Ok(());
        }
        debug!("Creating package marker {}", marker.display());
        fs::write(marker, PACKAGE_MARKER_CONTENT)?;
        Ok(())
    }
}
