//! Pipeline tests for hrmake
//!
//! These tests drive the whole make pipeline over temporary projects,
//! using a recording formatter instead of an installed `black`.

pub mod generated_code;
pub mod reference_resolution;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hrmake::batch::{main_make, MakeReport};
use hrmake::configuration::MakeSettings;
use hrmake::errors::{MakeError, Result};
use hrmake::formatter::SourceFormatter;
use hrmake::maker::Maker;
use hrmake::project::MarkerRootResolver;
use tempfile::TempDir;

/// Formatter that records the files it was asked to format
#[derive(Debug, Clone, Default)]
pub struct RecordingFormatter {
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail: bool,
}

impl RecordingFormatter {
    pub fn with_failure(mut self, should_fail: bool) -> Self {
        self.should_fail = should_fail;
        self
    }

    pub fn formatted(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl SourceFormatter for RecordingFormatter {
    fn name(&self) -> String {
        "recording".to_string()
    }

    fn format_files(
        &self,
        files: &[PathBuf],
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        let calls = self.calls.clone();
        let files = files.to_vec();
        let should_fail = self.should_fail;

        async move {
            if should_fail {
                return Err(MakeError::formatter_failed("mock", "exit status 123"));
            }
            calls.lock().unwrap().extend(files);
            Ok(())
        }
    }
}

/// A temporary project rooted at a `debugtalk.py` marker
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("debugtalk.py"), "").unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn maker(&self) -> Maker {
        let resolver = MarkerRootResolver::new("debugtalk.py", self.root());
        Maker::new(Box::new(resolver), MakeSettings::default()).unwrap()
    }

    pub async fn make(&self, paths: &[&str]) -> Result<MakeReport> {
        self.make_into(paths, None).await
    }

    pub async fn make_into(&self, paths: &[&str], output_dir: Option<&Path>) -> Result<MakeReport> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| self.root().join(p)).collect();
        let mut maker = self.maker();
        main_make(&mut maker, &paths, output_dir, &RecordingFormatter::default()).await
    }
}
