//! Stylesheet asset emission for the browser build
//!
//! Output names are a pure function of the module name and its content
//! digest (`a.module.css` -> `a-1A2B3C4D.css`), so an emitted file never
//! changes once written and can be cached indefinitely by whatever serves it.

use crate::cache::{CacheEntry, ContentDigest};
use crate::error::{CssModError, CssModResult};
use crate::resolve::module_stem;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Digest characters in an asset file name
pub const ASSET_DIGEST_PREFIX_LEN: usize = 8;

/// Extension of emitted assets
pub const ASSET_EXTENSION: &str = "css";

/// Writes transformed stylesheets to the output directory
pub struct AssetEmitter {
    output_dir: PathBuf,
    module_suffix: String,
    emitted: Mutex<HashMap<PathBuf, Arc<OnceCell<()>>>>,
    writes: AtomicU64,
}

impl AssetEmitter {
    pub fn new(output_dir: impl Into<PathBuf>, module_suffix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            module_suffix: module_suffix.into(),
            emitted: Mutex::new(HashMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Deterministic output path for `original` at `digest`
    pub fn asset_path(&self, original: &Path, digest: &ContentDigest) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}.{}",
            module_stem(original, &self.module_suffix),
            digest.prefix(ASSET_DIGEST_PREFIX_LEN),
            ASSET_EXTENSION
        ))
    }

    /// Materialize `entry` as the asset for `original`, returning its path
    ///
    /// Each path is written at most once per process; concurrent callers for
    /// the same path wait on the single write. A file already on disk is
    /// kept only when its bytes match `entry.output_text`, since the same
    /// name can carry different class names across builds. A failed write
    /// is returned to the caller and may be retried by a later request.
    pub async fn emit(&self, original: &Path, entry: &CacheEntry) -> CssModResult<PathBuf> {
        let path = self.asset_path(original, &entry.digest);

        let cell = {
            let mut emitted = self.emitted.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(emitted.entry(path.clone()).or_default())
        };

        cell.get_or_try_init(|| self.write(&path, &entry.output_text))
            .await?;

        Ok(path)
    }

    async fn write(&self, path: &Path, text: &str) -> CssModResult<()> {
        match fs::read(path).await {
            Ok(existing) if existing == text.as_bytes() => {
                debug!("Asset {} already up to date", path.display());
                return Ok(());
            }
            Ok(_) => debug!("Asset {} differs, rewriting", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!("Could not read existing asset {}: {}", path.display(), e),
        }

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| CssModError::AssetWrite {
                path: self.output_dir.clone(),
                source: e,
            })?;

        let tmp = path.with_extension(format!("{}.{}.tmp", ASSET_EXTENSION, std::process::id()));
        fs::write(&tmp, text)
            .await
            .map_err(|e| CssModError::AssetWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CssModError::AssetWrite {
                path: path.to_path_buf(),
                source: e,
            });
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        info!("Wrote {}", path.display());
        Ok(())
    }

    /// Number of files this emitter has written
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Directory assets are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn entry(css: &str) -> CacheEntry {
        CacheEntry {
            digest: ContentDigest::of(css.as_bytes()),
            class_map: BTreeMap::new(),
            output_text: css.to_string(),
        }
    }

    #[test]
    fn asset_path_is_deterministic() {
        let emitter = AssetEmitter::new("/out", ".module.css");
        let red = entry(".foo{color:red}");

        let first = emitter.asset_path(Path::new("/app/a.module.css"), &red.digest);
        let second = emitter.asset_path(Path::new("/app/a.module.css"), &red.digest);

        assert_eq!(first, second);
        assert_eq!(
            first,
            PathBuf::from(format!("/out/a-{}.css", red.digest.prefix(8)))
        );
    }

    #[test]
    fn asset_path_follows_content() {
        let emitter = AssetEmitter::new("/out", ".module.css");
        let original = Path::new("/app/a.module.css");

        let red = emitter.asset_path(original, &entry(".foo{color:red}").digest);
        let blue = emitter.asset_path(original, &entry(".foo{color:blue}").digest);

        assert_ne!(red, blue);
    }

    #[tokio::test]
    async fn emit_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let emitter = AssetEmitter::new(temp.path().join("public/build"), ".module.css");
        let red = entry(".a__foo___12345{color:red}");

        let path = emitter
            .emit(Path::new("/app/a.module.css"), &red)
            .await
            .unwrap();

        assert!(path.starts_with(temp.path().join("public/build")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), red.output_text);
        assert_eq!(emitter.writes(), 1);
    }

    #[tokio::test]
    async fn repeated_and_concurrent_emits_write_once() {
        let temp = TempDir::new().unwrap();
        let emitter = AssetEmitter::new(temp.path(), ".module.css");
        let red = entry(".foo{color:red}");
        let original = Path::new("/app/a.module.css");

        let paths = join_all((0..4).map(|_| emitter.emit(original, &red))).await;
        emitter.emit(original, &red).await.unwrap();

        assert!(paths.iter().all(|p| p.as_ref().unwrap() == paths[0].as_ref().unwrap()));
        assert_eq!(emitter.writes(), 1);
    }

    #[tokio::test]
    async fn matching_file_left_alone() {
        let temp = TempDir::new().unwrap();
        let red = entry(".foo{color:red}");
        let original = Path::new("/app/a.module.css");

        let earlier = AssetEmitter::new(temp.path(), ".module.css");
        let path = earlier.emit(original, &red).await.unwrap();

        // Next build, fresh emitter
        let emitter = AssetEmitter::new(temp.path(), ".module.css");
        assert_eq!(emitter.emit(original, &red).await.unwrap(), path);
        assert_eq!(emitter.writes(), 0);
    }

    #[tokio::test]
    async fn differing_file_rewritten() {
        let temp = TempDir::new().unwrap();
        let original = Path::new("/app/b.module.css");
        let current = CacheEntry {
            output_text: ".b__foo___77f87{color:red}".to_string(),
            ..entry(".foo{color:red}")
        };

        // Same name, classes from an earlier build
        let emitter = AssetEmitter::new(temp.path(), ".module.css");
        let path = emitter.asset_path(original, &current.digest);
        std::fs::write(&path, ".a__foo___77f87{color:red}").unwrap();

        assert_eq!(emitter.emit(original, &current).await.unwrap(), path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), current.output_text);
        assert_eq!(emitter.writes(), 1);
    }

    #[tokio::test]
    async fn content_change_keeps_old_asset() {
        let temp = TempDir::new().unwrap();
        let emitter = AssetEmitter::new(temp.path(), ".module.css");
        let original = Path::new("/app/a.module.css");

        let red = emitter.emit(original, &entry(".foo{color:red}")).await.unwrap();
        let blue = emitter.emit(original, &entry(".foo{color:blue}")).await.unwrap();

        assert_ne!(red, blue);
        assert_eq!(std::fs::read_to_string(&red).unwrap(), ".foo{color:red}");
        assert_eq!(std::fs::read_to_string(&blue).unwrap(), ".foo{color:blue}");
    }

    #[tokio::test]
    async fn write_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("build");
        std::fs::write(&blocker, "").unwrap();
        let emitter = AssetEmitter::new(&blocker, ".module.css");

        let err = emitter
            .emit(Path::new("/app/a.module.css"), &entry(".foo{}"))
            .await
            .unwrap_err();

        assert!(matches!(err, CssModError::AssetWrite { .. }));
        assert_eq!(emitter.writes(), 0);
    }
}
