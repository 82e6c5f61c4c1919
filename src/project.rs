//! Project root discovery.
//!
//! Generated modules import each other by dotted module path relative to the
//! project root, and reference paths inside testcases are written relative to
//! it. The root is the nearest ancestor directory containing the marker file
//! (`debugtalk.py` by default), falling back to the working directory.

use std::path::{Component, Path, PathBuf};

use moka::sync::Cache;
use tracing::{debug, trace};

use crate::errors::{MakeError, Result};

/// Resolves the project root for a testcase path.
pub trait ProjectRootResolver {
    /// Returns the absolute project root directory for `path`.
    fn find_root(&self, path: &Path) -> PathBuf;

    /// Returns `abs_path` relative to its project root.
    fn relative_to_root(&self, abs_path: &Path) -> Result<PathBuf> {
        let root = self.find_root(abs_path);
        abs_path
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                MakeError::Params(format!(
                    "failed to convert absolute path to relative path based on project root\n abs_path: {}\n root: {}",
                    abs_path.display(),
                    root.display()
                ))
            })
    }
}

/// Walks upward from a path looking for a marker file. Lookups are memoized
/// per starting directory.
#[derive(Clone, Debug)]
pub struct MarkerRootResolver {
    marker: String,
    fallback: PathBuf,
    cache: Cache<PathBuf, PathBuf>,
}

impl MarkerRootResolver {
    pub fn new(marker: impl Into<String>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            fallback: fallback.into(),
            cache: Cache::builder().max_capacity(1024).build(),
        }
    }

    fn locate(&self, start: &Path) -> PathBuf {
        for dir in start.ancestors() {
            if dir.join(&self.marker).is_file() {
                debug!("Found {} in {}", self.marker, dir.display());
                return dir.to_path_buf();
            }
        }
        trace!(
            "No {} above {}, using {}",
            self.marker,
            start.display(),
            self.fallback.display()
        );
        self.fallback.clone()
    }
}

impl ProjectRootResolver for MarkerRootResolver {
    fn find_root(&self, path: &Path) -> PathBuf {
        let start = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        if let Some(root) = self.cache.get(&start) {
            return root;
        }
        let root = self.locate(&start);
        self.cache.insert(start, root.clone());
        root
    }
}

/// A resolver pinned to one directory.
#[derive(Clone, Debug)]
pub struct FixedRootResolver(pub PathBuf);

impl ProjectRootResolver for FixedRootResolver {
    fn find_root(&self, _path: &Path) -> PathBuf {
        self.0.clone()
    }
}

/// Lexically normalizes `.` and `..` components without touching the
/// filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
