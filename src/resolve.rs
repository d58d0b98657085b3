//! Import specifier resolution
//!
//! `~/styles/a.module.css` resolves against the project source root;
//! everything else resolves against the importing file's directory.

use std::path::{Component, Path, PathBuf};

/// Prefix meaning "relative to the project source root"
pub const SOURCE_ROOT_ALIAS: &str = "~/";

/// Maps import specifiers to absolute file paths
#[derive(Debug, Clone)]
pub struct PathResolver {
    source_root: PathBuf,
}

impl PathResolver {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    /// Resolve `specifier` as imported from a file in `resolve_dir`
    ///
    /// Performs no existence check; a missing file surfaces when it is read.
    pub fn resolve(&self, specifier: &str, resolve_dir: &Path) -> PathBuf {
        let joined = match specifier.strip_prefix(SOURCE_ROOT_ALIAS) {
            Some(rest) => self.source_root.join(rest),
            None => resolve_dir.join(specifier),
        };
        normalize(&joined)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Base name of a module file with its module suffix removed
///
/// `a.module.css` with suffix `.module.css` gives `a`; a file without the
/// suffix loses only its final extension.
pub fn module_stem(path: &Path, module_suffix: &str) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.strip_suffix(module_suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name),
    }
}
