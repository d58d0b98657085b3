//! Module loading pipeline
//!
//! Resolves an import, obtains its cache entry and shapes the result the
//! way a bundler expects a virtual module: the class map as JSON contents
//! with a `json` loader. The browser target also materializes the
//! stylesheet and reports per-file failures as diagnostics so one bad file
//! does not abort the whole build.

use crate::cache::{
    CacheKey, CacheStore, CoordinatorStats, DedupCoordinator, FsCacheStore,
};
use crate::cache::store::KEY_NAMESPACE;
use crate::cache::ContentDigest;
use crate::config::{Config, LocalsConvention, ProjectPaths};
use crate::emit::AssetEmitter;
use crate::error::{CssModError, CssModResult};
use crate::resolve::PathResolver;
use crate::transform::{ScopedClassTransform, StyleTransform};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Namespace reported for loaded modules
pub const MODULE_NAMESPACE: &str = "css-modules-import";

/// Directories never searched for modules
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Which build the pipeline serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    /// Class map only
    Server,
    /// Class map plus an emitted stylesheet
    Browser,
}

impl BuildTarget {
    pub fn emits_assets(self) -> bool {
        matches!(self, Self::Browser)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// How the bundler should interpret `contents`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A build message attached to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    /// Error diagnostic for a failed request
    pub fn from_error(file: &Path, error: &CssModError) -> Self {
        let (message, line, column) = match error {
            CssModError::Transform { source, .. } => {
                (source.message.clone(), Some(source.line), Some(source.column))
            }
            other => (other.to_string(), None, None),
        };
        Self {
            severity: Severity::Error,
            message,
            file: file.to_path_buf(),
            line,
            column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, ":{}:{}", line, column)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of loading one module
#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    /// Absolute path of the module
    pub path: PathBuf,
    pub namespace: &'static str,
    /// Class map serialized as JSON, absent when the load failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    pub loader: Loader,
    /// Emitted stylesheet (browser target)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Diagnostic>,
}

impl LoadResult {
    fn failed(path: &Path, diagnostic: Diagnostic) -> Self {
        Self {
            path: path.to_path_buf(),
            namespace: MODULE_NAMESPACE,
            contents: None,
            loader: Loader::Json,
            asset: None,
            errors: vec![diagnostic],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolver, coordinator and (browser) emitter for one build session
pub struct Pipeline {
    paths: ProjectPaths,
    module_suffix: String,
    key_namespace: String,
    target: BuildTarget,
    resolver: PathResolver,
    coordinator: Arc<DedupCoordinator>,
    emitter: Option<AssetEmitter>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        paths: ProjectPaths,
        config: &Config,
        target: BuildTarget,
        store: Arc<dyn CacheStore>,
        transform: Arc<dyn StyleTransform>,
    ) -> Self {
        let module_suffix = config.project.module_suffix.clone();
        let emitter = target
            .emits_assets()
            .then(|| AssetEmitter::new(&paths.output_directory, module_suffix.clone()));

        Self {
            resolver: PathResolver::new(&paths.source_root),
            coordinator: Arc::new(DedupCoordinator::new(store, transform)),
            key_namespace: key_namespace(config),
            paths,
            module_suffix,
            target,
            emitter,
        }
    }

    /// Pipeline with the on-disk store and the built-in transform
    pub fn from_config(paths: ProjectPaths, config: &Config, target: BuildTarget) -> Self {
        let store = Arc::new(FsCacheStore::new(&paths.cache_directory));
        let transform = Arc::new(ScopedClassTransform::new(
            config.transform.clone(),
            config.project.module_suffix.clone(),
        ));
        Self::new(paths, config, target, store, transform)
    }

    /// Whether `path` names a CSS module
    pub fn is_css_module(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(&self.module_suffix))
    }

    /// Resolve and load an import
    pub async fn load(&self, specifier: &str, resolve_dir: &Path) -> CssModResult<LoadResult> {
        let path = self.resolver.resolve(specifier, resolve_dir);
        debug!("Resolved {} to {}", specifier, path.display());
        self.load_path(&path).await
    }

    /// Load an already-resolved module path
    ///
    /// Read failures are errors for both targets. Transform and asset-write
    /// failures are errors for the server target and diagnostics for the
    /// browser target.
    pub async fn load_path(&self, path: &Path) -> CssModResult<LoadResult> {
        let key = CacheKey::namespaced(&self.key_namespace, &self.paths.root, path);

        let entry = match self.coordinator.obtain(path, &key).await {
            Ok(entry) => entry,
            Err(e @ CssModError::Transform { .. }) if self.emitter.is_some() => {
                warn!("{}", e);
                return Ok(LoadResult::failed(path, Diagnostic::from_error(path, &e)));
            }
            Err(e) => return Err(e),
        };

        let asset = match &self.emitter {
            Some(emitter) => match emitter.emit(path, &entry).await {
                Ok(asset) => Some(asset),
                Err(e) => {
                    warn!("{}", e);
                    return Ok(LoadResult::failed(path, Diagnostic::from_error(path, &e)));
                }
            },
            None => None,
        };

        Ok(LoadResult {
            path: path.to_path_buf(),
            namespace: MODULE_NAMESPACE,
            contents: Some(serde_json::to_string(&entry.class_map)?),
            loader: Loader::Json,
            asset,
            errors: Vec::new(),
        })
    }

    /// Every module file under the source root, sorted
    pub async fn discover_modules(&self) -> CssModResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut pending = vec![self.paths.source_root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(CssModError::io(format!("reading directory {}", dir.display()), e))
                }
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| CssModError::io(format!("reading directory {}", dir.display()), e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| CssModError::io(format!("inspecting {}", path.display()), e))?;
                let name = entry.file_name().to_string_lossy().into_owned();

                if file_type.is_dir() {
                    if !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_str()) {
                        pending.push(path);
                    }
                } else if self.is_css_module(&path) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Assets written by this session (always 0 for the server target)
    pub fn assets_written(&self) -> u64 {
        self.emitter.as_ref().map_or(0, AssetEmitter::writes)
    }

    pub fn target(&self) -> BuildTarget {
        self.target
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }
}

/// `css-modules@<fingerprint>`: results built under other settings never match
fn key_namespace(config: &Config) -> String {
    let transform = &config.transform;
    let convention = match transform.locals_convention {
        LocalsConvention::AsIs => "as-is",
        LocalsConvention::CamelCase => "camel-case",
    };
    let hash_length = transform.hash_length.to_string();
    let settings = [
        transform.hash_prefix.as_str(),
        transform.scoped_name.as_str(),
        hash_length.as_str(),
        convention,
        config.project.module_suffix.as_str(),
    ]
    .join("\0");

    let fingerprint = ContentDigest::of(settings.as_bytes());
    format!("{}@{}", KEY_NAMESPACE, &fingerprint.as_str()[..8])
}
