//! Path checks used by configuration validation.

use super::{Access, Runtime};
use std::path::Path;

pub async fn is_dir(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.metadata(path).await.is_ok_and(|m| m.is_dir)
}

pub async fn is_file(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.metadata(path).await.is_ok_and(|m| m.is_file)
}

pub fn is_readable(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.access(path, Access::Read)
}

pub fn is_writable(runtime: &dyn Runtime, path: &Path) -> bool {
    runtime.access(path, Access::Write)
}

/// Whether `path` could be created: walks up to the nearest existing ancestor
/// and reports whether it is a writable directory.
pub async fn can_be_created(runtime: &dyn Runtime, path: &Path) -> bool {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            let cwd = Path::new(".");
            return is_dir(runtime, cwd).await && is_writable(runtime, cwd);
        }
        if runtime.exists(dir) {
            return is_dir(runtime, dir).await && is_writable(runtime, dir);
        }
        current = dir.parent();
    }
    false
}
