//! Memoizing runtime layer
//!
//! Wraps another [`Runtime`] and caches file contents, directory listings and
//! metadata by path. The first request for a path initializes a shared
//! `OnceCell`, so concurrent first reads of the same path hit the inner
//! runtime exactly once. Failed reads are not cached.

use super::{Access, FileMetadata, Runtime, RuntimeResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

type Slot<T> = Arc<OnceCell<T>>;

#[derive(Debug)]
pub struct CachedRuntime<R> {
    inner: R,
    files: DashMap<PathBuf, Slot<Arc<Vec<u8>>>>,
    dirs: DashMap<PathBuf, Slot<Vec<String>>>,
    stats: DashMap<PathBuf, Slot<FileMetadata>>,
}

impl<R: Runtime> CachedRuntime<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            files: DashMap::new(),
            dirs: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Access the wrapped runtime
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn slot<T>(map: &DashMap<PathBuf, Slot<T>>, path: &Path) -> Slot<T> {
        // Clone the Arc out so the shard lock is not held across an await.
        map.entry(path.to_path_buf()).or_default().clone()
    }

    /// Drop cached state for `path` and its parent listing after a mutation.
    fn invalidate(&self, path: &Path) {
        self.files.remove(path);
        self.stats.remove(path);
        self.dirs.remove(path);
        if let Some(parent) = path.parent() {
            self.dirs.remove(parent);
            self.stats.remove(parent);
        }
    }

    fn invalidate_tree(&self, root: &Path) {
        self.files.retain(|p, _| !p.starts_with(root));
        self.dirs.retain(|p, _| !p.starts_with(root));
        self.stats.retain(|p, _| !p.starts_with(root));
        self.invalidate(root);
    }
}

#[async_trait]
impl<R: Runtime> Runtime for CachedRuntime<R> {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let slot = Self::slot(&self.files, path);
        let content = slot
            .get_or_try_init(|| async { self.inner.read_file(path).await.map(Arc::new) })
            .await?;
        Ok(content.as_ref().clone())
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        self.inner.write_file(path, content).await?;
        self.invalidate(path);
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let slot = Self::slot(&self.stats, path);
        slot.get_or_try_init(|| self.inner.metadata(path))
            .await
            .cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        if self.stats.get(path).is_some_and(|s| s.initialized()) {
            return true;
        }
        self.inner.exists(path)
    }

    fn access(&self, path: &Path, mode: Access) -> bool {
        self.inner.access(path, mode)
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        self.inner.create_dir(path, recursive).await?;
        let mut current = Some(path);
        while let Some(p) = current {
            self.invalidate(p);
            current = if recursive { p.parent() } else { None };
        }
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> RuntimeResult<()> {
        self.inner.remove_dir_all(path).await?;
        self.invalidate_tree(path);
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let slot = Self::slot(&self.dirs, path);
        slot.get_or_try_init(|| self.inner.read_dir(path))
            .await
            .cloned()
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        self.inner.copy_file(from, to).await?;
        self.invalidate(to);
        Ok(())
    }
}
