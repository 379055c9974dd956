//! Source tree interface - where project files come from.
//!
//! Pipelines only need two things from a project checkout: the contents of
//! a few well-known files (the `.toolchains` manifest, `schema.sql`) and the
//! listing of the root directory (to detect optional components such as
//! `ui-old`).
//!
//! # The Minimal Interface
//!
//! ```rust
//! use devstack::source::{MemoryTree, SourceTree};
//!
//! let tree = MemoryTree::new().file(".toolchains", "go\nrust=1.80.0\n");
//! assert_eq!(tree.read_file(".toolchains").unwrap().as_deref(), Some("go\nrust=1.80.0\n"));
//! assert!(tree.read_file("missing").unwrap().is_none());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// =============================================================================
// THE CORE TRAIT
// =============================================================================

/// Read access to a project source tree.
pub trait SourceTree {
    /// Returns the contents of `path`, relative to the tree root.
    ///
    /// A file that does not exist is `Ok(None)`, not an error. Any other
    /// failure to read it is returned as [`Error::Io`].
    fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// Lists the names of the entries at the tree root, sorted.
    fn entries(&self) -> Result<Vec<String>>;

    /// Returns true if the tree root has an entry called `name`.
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.entries()?.iter().any(|e| e == name))
    }
}

// =============================================================================
// BUILT-IN IMPLEMENTATIONS
// =============================================================================

/// A source tree backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    /// Creates a tree rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceTree for LocalDir {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let full = self.root.join(path);
        match fs::read_to_string(&full) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Io { path: full, source }),
        }
    }

    fn entries(&self) -> Result<Vec<String>> {
        let read = fs::read_dir(&self.root).map_err(|source| Error::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in read {
            let entry = entry.map_err(|source| Error::Io {
                path: self.root.clone(),
                source,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// An in-memory source tree.
///
/// Paths are stored verbatim; the root listing is derived from the first
/// component of every stored path.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, String>,
}

impl MemoryTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file to the tree.
    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }
}

impl SourceTree for MemoryTree {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }

    fn entries(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|p| p.split('/').next())
            .map(|s| s.to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
