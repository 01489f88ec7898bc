//! Asset rename table.
//!
//! Every local file referenced from a stylesheet or from markup is renamed to
//! the shortest prefix of its content digest that no other file with the same
//! extension already uses. Records are memoized per source path for the whole
//! run.

use crate::runtime::{Runtime, RuntimeResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Where a referenced file ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Short file name: mini hash plus the original extension
    pub name: String,
    /// Full URL-safe content digest
    pub hash: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

#[derive(Debug, Default)]
struct Partition {
    used_prefixes: FxHashSet<String>,
}

/// Run-scoped asset rename table.
///
/// First-time association of a path runs inside that path's `OnceCell`, so
/// concurrent requests for one file wait for the first and observe its record
/// instead of reserving a second prefix.
#[derive(Debug)]
pub struct AssetRenameTable {
    runtime: Arc<dyn Runtime>,
    records: DashMap<PathBuf, Arc<OnceCell<AssetRecord>>>,
    partitions: Mutex<FxHashMap<String, Partition>>,
    copied: Mutex<FxHashSet<PathBuf>>,
}

/// Drop a trailing query string.
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Lowercased extension without the dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// SHA-256 of `content` in base64 with `/` as `-`, `+` as `_` and no padding.
pub fn content_digest(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    STANDARD_NO_PAD
        .encode(digest)
        .replace('/', "-")
        .replace('+', "_")
}

/// Shortest prefix of `hash` (at least one character) missing from `used`.
///
/// Two files with identical content share a digest; once every prefix is
/// taken the full digest gets a numeric suffix.
pub fn shortest_free_prefix(hash: &str, used: &FxHashSet<String>) -> String {
    for (end, _) in hash.char_indices().skip(1).chain([(hash.len(), ' ')]) {
        let prefix = &hash[..end];
        if !used.contains(prefix) {
            return prefix.to_string();
        }
    }
    (1u32..)
        .map(|n| format!("{hash}{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| hash.to_string())
}

impl AssetRenameTable {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            records: DashMap::new(),
            partitions: Mutex::new(FxHashMap::default()),
            copied: Mutex::new(FxHashSet::default()),
        }
    }

    /// Return the record for `source_url`, reading and hashing the file on
    /// first use. The destination directory of the first call wins.
    pub async fn associate(
        &self,
        source_url: &str,
        destination_dir: &Path,
    ) -> RuntimeResult<AssetRecord> {
        let source_path = PathBuf::from(strip_query(source_url));
        let cell = self
            .records
            .entry(source_path.clone())
            .or_default()
            .clone();

        cell.get_or_try_init(|| self.create_record(source_path, destination_dir))
            .await
            .cloned()
    }

    async fn create_record(
        &self,
        source_path: PathBuf,
        destination_dir: &Path,
    ) -> RuntimeResult<AssetRecord> {
        let content = self.runtime.read_file(&source_path).await?;
        let hash = content_digest(&content);
        let extension = extension_of(&source_path);

        let mini_hash = {
            let mut partitions = self.partitions.lock();
            let partition = partitions.entry(extension.clone()).or_default();
            let prefix = shortest_free_prefix(&hash, &partition.used_prefixes);
            partition.used_prefixes.insert(prefix.clone());
            prefix
        };

        let name = if extension.is_empty() {
            mini_hash
        } else {
            format!("{mini_hash}.{extension}")
        };

        tracing::debug!(
            source = %source_path.display(),
            name = %name,
            "renamed asset"
        );

        Ok(AssetRecord {
            destination_path: destination_dir.join(&name),
            name,
            hash,
            source_path,
        })
    }

    /// Look up an existing record without touching the filesystem.
    pub fn get(&self, source_url: &str) -> Option<AssetRecord> {
        self.records
            .get(Path::new(strip_query(source_url)))
            .and_then(|cell| cell.get().cloned())
    }

    /// Claim the copy of `record`; true only for the first caller.
    pub fn claim_copy(&self, record: &AssetRecord) -> bool {
        self.copied.lock().insert(record.source_path.clone())
    }

    /// Every associated record, sorted by destination.
    pub fn records(&self) -> Vec<AssetRecord> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();
        records.sort_by(|a, b| a.destination_path.cmp(&b.destination_path));
        records
    }

    pub fn len(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
