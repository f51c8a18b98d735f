//! In-memory filesystem standing in for `/proc`.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::collector::traits::FileSystem;

/// In-memory [`FileSystem`].
///
/// Files are plain strings keyed by absolute path; parent directories are
/// registered automatically so `read_dir` behaves like the real thing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file, creating its parent directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path, content.into());
    }

    /// Adds a directory and all of its ancestors.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let mut current = Some(path.as_ref());
        while let Some(p) = current {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            current = p.parent();
        }
    }

    /// Removes a file or a whole directory subtree.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.retain(|p, _| !p.starts_with(path));
        self.directories.retain(|p| !p.starts_with(path));
    }

    /// Adds `/proc/<pid>/stat` and `/proc/<pid>/cmdline`.
    pub fn add_process(&mut self, pid: u32, stat: &str, cmdline: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(base.join("task"));
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("cmdline"), cmdline);
    }

    /// Adds `/proc/<pid>/task/<tid>/stat`.
    pub fn add_thread(&mut self, pid: u32, tid: u64, stat: &str) {
        self.add_file(format!("/proc/{}/task/{}/stat", pid, tid), stat);
    }
}

/// Builds a `stat` line with the fields `ProcfsSource` reads; the rest are
/// plausible constants.
pub fn stat_line(
    id: u64,
    comm: &str,
    state: char,
    utime: u64,
    stime: u64,
    num_threads: u32,
    starttime: u64,
) -> String {
    format!(
        "{id} ({comm}) {state} 1 {id} {id} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 20 0 {num_threads} 0 {starttime} 1048576 256"
    )
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let children: HashSet<PathBuf> = self
            .files
            .keys()
            .chain(self.directories.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        Ok(children.into_iter().collect())
    }
}
