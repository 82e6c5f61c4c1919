//! Compiling testcases into pytest modules.
//!
//! A [`Maker`] owns the compilation cache for one run: every source document
//! is compiled at most once, and referenced testcases are compiled on demand
//! before the step that calls them is rendered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, info};

use crate::chain::{config_chain, step_chain};
use crate::compat;
use crate::configuration::MakeSettings;
use crate::emitter::{CompiledUnit, Emitter};
use crate::errors::{MakeError, Result};
use crate::loader::load_test_file;
use crate::model::{StepKind, TestCase, TestCaseRef};
use crate::paths::{class_name_for, convert_testcase_path, module_name};
use crate::project::{normalize_path, ProjectRootResolver};
use crate::pyliteral::{dq, to_literal};

/// A module produced during this run.
#[derive(Debug, Clone, PartialEq)]
pub struct MadeTestCase {
    /// Source document the module was generated from.
    pub source: PathBuf,
    /// Class name without the `TestCase` prefix.
    pub class_name: String,
    /// Variables exported by the testcase config.
    pub export: Vec<String>,
}

pub struct Maker {
    resolver: Box<dyn ProjectRootResolver>,
    settings: MakeSettings,
    emitter: Emitter,
    cache: IndexMap<PathBuf, MadeTestCase>,
    classes: HashMap<(PathBuf, String), PathBuf>,
    run_set: IndexSet<PathBuf>,
    resolving: Vec<PathBuf>,
}

impl Maker {
    pub fn new(resolver: Box<dyn ProjectRootResolver>, settings: MakeSettings) -> Result<Self> {
        let emitter = Emitter::new(settings.package_marker.clone())?;
        Ok(Self {
            resolver,
            settings,
            emitter,
            cache: IndexMap::new(),
            classes: HashMap::new(),
            run_set: IndexSet::new(),
            resolving: Vec::new(),
        })
    }

    pub fn settings(&self) -> &MakeSettings {
        &self.settings
    }

    /// Generated files in the order they were made.
    pub fn made_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.cache.keys()
    }

    pub fn made(&self, python_path: &Path) -> Option<&MadeTestCase> {
        self.cache.get(python_path)
    }

    /// Files to hand to the test runner.
    pub fn run_set(&self) -> &IndexSet<PathBuf> {
        &self.run_set
    }

    pub fn add_to_run_set(&mut self, path: PathBuf) {
        self.run_set.insert(path);
    }

    /// Compile one raw document loaded from `source` and return the path of
    /// the generated module. With `output_dir` the module is written there
    /// instead of next to the source; referenced testcases are always
    /// written next to their sources.
    pub fn make_testcase(
        &mut self,
        raw: Value,
        source: &Path,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let source = normalize_path(source);
        let document = compat::normalize(raw)?;
        let mut testcase = TestCase::from_document(&document, source.clone())?;
        info!("start to make testcase: {}", source.display());

        let (mut python_path, class_name) =
            convert_testcase_path(self.resolver.as_ref(), &source, &self.settings.generated_suffix)?;
        if let Some(dir) = output_dir {
            if let Some(file_name) = python_path.file_name() {
                python_path = dir.join(file_name);
            }
        }

        if let Some(made) = self.cache.get(&python_path) {
            if made.source != source {
                return Err(MakeError::IdentifierCollision(format!(
                    "{} and {} both generate {}",
                    made.source.display(),
                    source.display(),
                    python_path.display()
                )));
            }
            debug!("cache hit: {}", python_path.display());
            return Ok(python_path);
        }

        if let Some(pos) = self.resolving.iter().position(|p| *p == source) {
            let mut cycle = self.resolving[pos..].to_vec();
            cycle.push(source);
            return Err(MakeError::CyclicReference(cycle));
        }

        self.resolving.push(source.clone());
        let imports = self.resolve_references(&mut testcase);
        self.resolving.pop();
        let imports = imports?;

        let unit = self.compile(&testcase, &class_name, imports)?;
        self.register_class(&python_path, &class_name, &source)?;
        self.emitter.emit(&unit, &python_path)?;

        self.cache.insert(
            python_path.clone(),
            MadeTestCase {
                source,
                class_name,
                export: testcase.config.export.clone().unwrap_or_default(),
            },
        );
        Ok(python_path)
    }

    /// Compile every referenced testcase, rewrite the reference steps to call
    /// the compiled classes and return the import statements they need.
    fn resolve_references(&mut self, testcase: &mut TestCase) -> Result<Vec<String>> {
        let mut imports: Vec<String> = Vec::new();
        let mut aliases: IndexMap<String, String> = IndexMap::new();
        let source = testcase.config.path.clone();

        for step in testcase.steps.iter_mut() {
            let raw_ref = match &step.kind {
                StepKind::Reference(TestCaseRef::Path(path)) => path.clone(),
                _ => continue,
            };

            let ref_path = self.ensure_absolute(&source, &raw_ref)?;
            let content = load_test_file(&ref_path)?;
            if !content.is_object() {
                return Err(MakeError::format(
                    format!("Invalid teststep '{}'", step.name),
                    format!("referenced testcase {} is not a mapping", ref_path.display()),
                ));
            }

            let ref_python_path = self.make_testcase(content, &ref_path, None)?;
            let made = self.cache.get(&ref_python_path).cloned().ok_or_else(|| {
                MakeError::Params(format!("{} was not generated", ref_python_path.display()))
            })?;

            if !made.export.is_empty() {
                let export = step.export.get_or_insert_with(Vec::new);
                for var in made.export {
                    if !export.contains(&var) {
                        export.push(var);
                    }
                }
            }

            let module = module_name(self.resolver.as_ref(), &ref_python_path)?;
            let alias = match aliases.iter().find(|(_, m)| **m == module) {
                Some((alias, _)) => alias.clone(),
                None => {
                    let alias = unique_alias(&aliases, &made.class_name, &module);
                    imports.push(format!(
                        "from {} import TestCase{} as {}",
                        module, made.class_name, alias
                    ));
                    aliases.insert(alias.clone(), module);
                    alias
                }
            };

            step.kind = StepKind::Reference(TestCaseRef::Compiled(alias));
        }

        Ok(imports)
    }

    /// Reference paths are relative to the project root unless absolute.
    fn ensure_absolute(&self, referrer: &Path, raw: &str) -> Result<PathBuf> {
        let trimmed = raw
            .strip_prefix("./")
            .or_else(|| raw.strip_prefix(".\\"))
            .unwrap_or(raw);
        let path = PathBuf::from(trimmed.replace('\\', "/"));
        let path = if path.is_absolute() {
            path
        } else {
            self.resolver.find_root(referrer).join(path)
        };
        let path = normalize_path(&path);
        if !path.is_file() {
            return Err(MakeError::TestcaseNotFound(format!(
                "Invalid testcase file path: {}",
                path.display()
            )));
        }
        Ok(path)
    }

    fn compile(
        &self,
        testcase: &TestCase,
        class_name: &str,
        mut imports: Vec<String>,
    ) -> Result<CompiledUnit> {
        let config = &testcase.config;
        let relative = self.resolver.relative_to_root(&config.path)?;
        let diff_levels = relative.components().count();
        if !imports.is_empty() && diff_levels > 0 {
            imports.insert(
                0,
                format!(
                    "import sys\nfrom pathlib import Path\nsys.path.insert(0, str(Path(__file__){}))\n",
                    ".parent".repeat(diff_levels)
                ),
            );
        }

        let teststeps = testcase
            .steps
            .iter()
            .map(step_chain)
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledUnit {
            version: self.settings.runner_version.clone(),
            testcase_path: relative
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/"),
            class_name: format!("TestCase{}", class_name),
            imports,
            config_chain: config_chain(config),
            skip: config.skip.as_deref().map(dq),
            marks: config.marks.clone().unwrap_or_default(),
            parameters: config.parameters.as_ref().map(to_literal),
            reference_testcase: testcase.has_reference(),
            teststeps,
        })
    }

    /// Two sources must not produce the same class in one directory.
    fn register_class(&mut self, python_path: &Path, class_name: &str, source: &Path) -> Result<()> {
        let dir = python_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let key = (dir, class_name.to_string());
        match self.classes.get(&key) {
            Some(existing) if existing != source => Err(MakeError::IdentifierCollision(format!(
                "{} and {} both define class TestCase{} in {}",
                existing.display(),
                source.display(),
                class_name,
                key.0.display()
            ))),
            Some(_) => Ok(()),
            None => {
                self.classes.insert(key, source.to_path_buf());
                Ok(())
            }
        }
    }
}

/// Import alias for a referenced class. Same-named classes from different
/// modules are told apart by their dotted module path.
fn unique_alias(taken: &IndexMap<String, String>, class_name: &str, module: &str) -> String {
    if !taken.contains_key(class_name) {
        return class_name.to_string();
    }
    let qualified = class_name_for(&module.replace('.', "_"));
    let mut alias = qualified.clone();
    let mut n = 2;
    while taken.contains_key(&alias) {
        alias = format!("{}{}", qualified, n);
        n += 1;
    }
    alias
}
