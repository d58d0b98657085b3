//! Persistent transform cache on disk
//!
//! One JSON file per logical source file under
//! `<cache_directory>/css-modules/`. Every operation is best-effort: a
//! broken or unreadable store costs a recomputation, never a failed build.

use crate::cache::digest::ContentDigest;
use crate::error::{CssModError, CssModResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

/// Namespace tag prefixed to every cache key
pub const KEY_NAMESPACE: &str = "css-modules";

/// Full result of transforming one version of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEntry {
    /// Digest of the source bytes this entry was produced from
    pub digest: ContentDigest,

    /// Local class name -> generated class name
    pub class_map: BTreeMap<String, String>,

    /// Rewritten style text
    pub output_text: String,
}

/// Stable persistent-store key derived from a file's project-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for `path` under the plain `css-modules` namespace
    pub fn for_path(project_root: &Path, path: &Path) -> Self {
        Self::namespaced(KEY_NAMESPACE, project_root, path)
    }

    /// Build the key for `path`, relative to `project_root` when possible
    ///
    /// Paths outside the project keep their full form so they cannot collide
    /// with project files. `namespace` separates results produced under
    /// different transform settings.
    pub fn namespaced(namespace: &str, project_root: &Path, path: &Path) -> Self {
        let logical = match path.strip_prefix(project_root) {
            Ok(relative) => relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string_lossy().into_owned(),
        };
        Self(format!("{}:{}", namespace, logical))
    }

    /// The key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe name for the entry file
    fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{}.json", hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a persistent-store read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// An entry exists (it may still be stale, the caller checks the digest)
    Hit(CacheEntry),
    /// Nothing stored under this key
    Miss,
    /// The store could not be read; treated like a miss by callers
    Unavailable(String),
}

/// Durable key/value store for transform results
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the entry stored under `key`. Never fails.
    async fn get(&self, key: &CacheKey) -> Lookup;

    /// Store `entry` under `key`. Failures are logged and dropped.
    async fn put(&self, key: &CacheKey, entry: &CacheEntry);
}

/// On-disk payload: the entry plus the key it was written for
#[derive(Debug, Deserialize)]
struct PersistedEntry {
    #[serde(default)]
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

#[derive(Serialize)]
struct PersistedEntryRef<'a> {
    key: &'a str,
    #[serde(flatten)]
    entry: &'a CacheEntry,
}

/// Summary of what the store currently holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of entry files
    pub entries: usize,
    /// Total size of entry files in bytes
    pub bytes: u64,
    /// Modification time of the most recently written entry
    pub last_written: Option<DateTime<Utc>>,
}

/// JSON-file store under a project-local cache directory
pub struct FsCacheStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl FsCacheStore {
    /// Create a store rooted at `<cache_directory>/css-modules`
    ///
    /// Nothing is created on disk until the first write.
    pub fn new(cache_directory: &Path) -> Self {
        Self {
            root: cache_directory.join(KEY_NAMESPACE),
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// Directory holding the entry files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    async fn write_entry(&self, key: &CacheKey, entry: &CacheEntry) -> CssModResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            CssModError::io(format!("creating cache directory {}", self.root.display()), e)
        })?;

        let content = serde_json::to_string(&PersistedEntryRef {
            key: key.as_str(),
            entry,
        })?;

        // Write to a sibling then rename so readers never see a partial file
        let path = self.entry_path(key);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));

        fs::write(&tmp, content)
            .await
            .map_err(|e| CssModError::io(format!("writing cache file {}", tmp.display()), e))?;

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CssModError::io(
                format!("moving cache file into place at {}", path.display()),
                e,
            ));
        }

        Ok(())
    }

    /// Count entries and their total size
    pub async fn stats(&self) -> CssModResult<StoreStats> {
        let mut stats = StoreStats::default();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(CssModError::io("reading cache directory", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CssModError::io("reading cache entry", e))?
        {
            if !is_entry_file(&entry.path()) {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| CssModError::io("reading cache entry metadata", e))?;

            stats.entries += 1;
            stats.bytes += meta.len();
            if let Ok(modified) = meta.modified() {
                let modified = DateTime::<Utc>::from(modified);
                if stats.last_written.is_none_or(|last| modified > last) {
                    stats.last_written = Some(modified);
                }
            }
        }

        Ok(stats)
    }

    /// Remove every entry file, returning how many were removed
    pub async fn clear(&self) -> CssModResult<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CssModError::io("reading cache directory", e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CssModError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if is_entry_file(&path) || path.extension().is_some_and(|ext| ext == "tmp") {
                fs::remove_file(&path).await.map_err(|e| {
                    CssModError::io(format!("removing cache file {}", path.display()), e)
                })?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, key: &CacheKey) -> Lookup {
        let path = self.entry_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Miss,
            Err(e) => return Lookup::Unavailable(format!("reading {}: {}", path.display(), e)),
        };

        match serde_json::from_str::<PersistedEntry>(&content) {
            Ok(persisted) if persisted.key == key.as_str() => Lookup::Hit(persisted.entry),
            Ok(persisted) => {
                debug!(
                    "Cache file {} belongs to {}, not {}",
                    path.display(),
                    persisted.key,
                    key
                );
                Lookup::Miss
            }
            Err(e) => Lookup::Unavailable(format!("parsing {}: {}", path.display(), e)),
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) {
        match self.write_entry(key, entry).await {
            Ok(()) => debug!("Persisted {} ({})", key, entry.digest.short()),
            Err(e) => warn!("Failed to persist cache entry for {}: {}", key, e),
        }
    }
}
