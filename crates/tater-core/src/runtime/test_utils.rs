//! In-memory runtime for tests
//!
//! Paths are stored verbatim; callers should use absolute, normalized paths.
//! Directories are implicit parents of inserted files, plus any directory
//! inserted explicitly.

use super::{Access, FileMetadata, Runtime, RuntimeError, RuntimeResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct MemoryFs {
    files: FxHashMap<PathBuf, Vec<u8>>,
    dirs: FxHashSet<PathBuf>,
    read_only: FxHashSet<PathBuf>,
    unlistable: FxHashSet<PathBuf>,
    reads: FxHashMap<PathBuf, usize>,
}

impl MemoryFs {
    fn add_parents(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }
}

/// Thread-safe in-memory filesystem
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    fs: RwLock<MemoryFs>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, creating its parent directories
    pub fn insert_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut fs = self.fs.write();
        fs.add_parents(&path);
        fs.files.insert(path, content.into());
    }

    /// Insert an empty directory
    pub fn insert_dir(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut fs = self.fs.write();
        fs.add_parents(&path);
        fs.dirs.insert(path);
    }

    /// Mark a path as not writable
    pub fn set_read_only(&self, path: impl Into<PathBuf>) {
        self.fs.write().read_only.insert(path.into());
    }

    /// Make `read_dir` fail for a directory
    pub fn fail_read_dir(&self, path: impl Into<PathBuf>) {
        self.fs.write().unlistable.insert(path.into());
    }

    /// Number of times `read_file` reached this runtime for `path`
    pub fn read_count(&self, path: &Path) -> usize {
        self.fs.read().reads.get(path).copied().unwrap_or(0)
    }

    /// Content of a file written during the test, if any
    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.fs.read().files.get(path).cloned()
    }

    /// All file paths, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.fs.read().files.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let mut fs = self.fs.write();
        *fs.reads.entry(path.to_path_buf()).or_default() += 1;
        fs.files
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let mut fs = self.fs.write();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !fs.is_dir(parent) => {
                return Err(RuntimeError::FileNotFound(parent.to_path_buf()));
            }
            _ => {}
        }
        fs.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let fs = self.fs.read();
        let readonly = fs.read_only.contains(path);
        if let Some(content) = fs.files.get(path) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
                readonly,
                modified: None,
            });
        }
        if fs.is_dir(path) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                readonly,
                modified: None,
            });
        }
        Err(RuntimeError::FileNotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        let fs = self.fs.read();
        fs.files.contains_key(path) || fs.is_dir(path)
    }

    fn access(&self, path: &Path, mode: Access) -> bool {
        let fs = self.fs.read();
        let exists = fs.files.contains_key(path) || fs.is_dir(path);
        match mode {
            Access::Read => exists,
            Access::Write => exists && !fs.read_only.contains(path),
        }
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let mut fs = self.fs.write();
        if !recursive {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !fs.is_dir(parent) {
                    return Err(RuntimeError::FileNotFound(parent.to_path_buf()));
                }
            }
        }
        fs.add_parents(path);
        fs.dirs.insert(path.to_path_buf());
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        let mut fs = self.fs.write();
        if !fs.is_dir(path) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        fs.files.retain(|p, _| !p.starts_with(path));
        fs.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let fs = self.fs.read();
        if !fs.is_dir(path) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        if fs.unlistable.contains(path) {
            return Err(RuntimeError::Io(format!(
                "permission denied: {}",
                path.display()
            )));
        }
        let children = fs
            .files
            .keys()
            .chain(fs.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string));
        let mut names: Vec<String> = children.collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
