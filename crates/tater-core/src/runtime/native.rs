//! Native filesystem runtime
//!
//! Blocking `std::fs` calls are moved onto tokio's blocking pool so the
//! cooperative scheduler never stalls on disk I/O.

use super::{Access, FileMetadata, Runtime, RuntimeError, RuntimeResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;

/// Runtime backed by the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> RuntimeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {} {}: {}", action, path.display(), e))
    }
}

async fn blocking<T, F>(f: F) -> RuntimeResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RuntimeResult<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        blocking(move || std::fs::read(&path).map_err(|e| io_error("read", &path, e))).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        let content = content.to_vec();
        blocking(move || std::fs::write(&path, content).map_err(|e| io_error("write", &path, e)))
            .await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = path.to_path_buf();
        blocking(move || {
            let metadata =
                std::fs::metadata(&path).map_err(|e| io_error("get metadata for", &path, e))?;

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64);

            Ok(FileMetadata {
                size: metadata.len(),
                is_dir: metadata.is_dir(),
                is_file: metadata.is_file(),
                readonly: metadata.permissions().readonly(),
                modified,
            })
        })
        .await
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn access(&self, path: &Path, mode: Access) -> bool {
        match mode {
            Access::Read if path.is_dir() => std::fs::read_dir(path).is_ok(),
            Access::Read => std::fs::File::open(path).is_ok(),
            Access::Write => std::fs::metadata(path)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false),
        }
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        blocking(move || {
            let result = if recursive {
                std::fs::create_dir_all(&path)
            } else {
                std::fs::create_dir(&path)
            };
            result.map_err(|e| io_error("create directory", &path, e))
        })
        .await
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        blocking(move || std::fs::remove_dir_all(&path).map_err(|e| io_error("remove", &path, e)))
            .await
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let path: PathBuf = path.to_path_buf();
        blocking(move || {
            let entries =
                std::fs::read_dir(&path).map_err(|e| io_error("read directory", &path, e))?;

            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| {
                    RuntimeError::Io(format!("Failed to read directory entry: {}", e))
                })?;
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
            Ok(names)
        })
        .await
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        let from = from.to_path_buf();
        let to = to.to_path_buf();
        blocking(move || {
            std::fs::copy(&from, &to)
                .map(|_| ())
                .map_err(|e| io_error("copy", &from, e))
        })
        .await
    }
}
