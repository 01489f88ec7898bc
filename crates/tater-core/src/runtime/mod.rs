//! Filesystem runtime abstraction.
//!
//! All file access in the bundler goes through the [`Runtime`] trait so the
//! rewrite logic can be exercised against an in-memory filesystem in tests.
//! [`NativeRuntime`] talks to the real filesystem, [`CachedRuntime`] memoizes
//! reads, directory listings and metadata on top of any other runtime.

mod cached;
pub mod checks;
mod native;

#[cfg(test)]
pub mod test_utils;

pub use cached::CachedRuntime;
pub use native::NativeRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// File metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a file
    pub is_file: bool,
    /// Whether the entry is marked read-only
    pub readonly: bool,
    /// Last modified timestamp (milliseconds since epoch)
    pub modified: Option<u64>,
}

/// Access mode probed by [`Runtime::access`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Platform runtime trait
///
/// Relative paths are interpreted by the implementation (the native runtime
/// resolves them against the process working directory).
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Write a file, replacing any existing content
    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    /// Get file metadata
    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check whether the current process may read or write `path`
    fn access(&self, path: &Path, mode: Access) -> bool;

    /// Create a directory
    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Remove a directory and everything below it
    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()>;

    /// List the entry names of a directory
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Copy a file
    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        let content = self.read_file(from).await?;
        self.write_file(to, &content).await
    }
}
