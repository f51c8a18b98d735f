//! Filesystem seam for `/proc` access.
//!
//! `ProcfsSource` never touches `std::fs` directly; it goes through
//! [`FileSystem`] so the same code runs against the live `/proc` tree or an
//! in-memory [`MockFs`](crate::collector::MockFs) in tests.

use std::io;
use std::path::{Path, PathBuf};

/// Read-only view of a filesystem.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns `true` if `path` names an existing file or directory.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the direct children of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Lists the children of `path` whose file name is a decimal number,
    /// sorted ascending. Used for `/proc/<pid>/task`.
    fn read_numeric_dir(&self, path: &Path) -> io::Result<Vec<u64>> {
        let mut ids: Vec<u64> = self
            .read_dir(path)?
            .iter()
            .filter_map(|p| p.file_name()?.to_str()?.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}
