//! Configuration schema for cssmod
//!
//! Configuration is stored in `cssmod.toml` at the project root.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Project layout
    pub project: ProjectConfig,

    /// Class scoping settings for the built-in transform
    pub transform: TransformConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Project layout, relative to the directory holding `cssmod.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory the `~/` import alias points at
    pub source_root: PathBuf,

    /// Directory for the persistent transform cache
    pub cache_directory: PathBuf,

    /// Directory emitted stylesheets are written to (browser target)
    pub output_directory: PathBuf,

    /// File name suffix that marks a CSS module
    pub module_suffix: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("app"),
            cache_directory: PathBuf::from(".cache"),
            output_directory: PathBuf::from("public/build"),
            module_suffix: ".module.css".to_string(),
        }
    }
}

/// How class names are exported in the class map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalsConvention {
    /// Export class names exactly as written
    AsIs,
    /// Export dashed names under both the original and a camelCase key
    #[default]
    CamelCase,
}

/// Scoped class name generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Salt mixed into every generated hash
    pub hash_prefix: String,

    /// Name template: `[name]`, `[local]` and `[hash]` are substituted
    pub scoped_name: String,

    /// Number of hex characters taken for `[hash]`
    pub hash_length: usize,

    /// Class map key convention
    pub locals_convention: LocalsConvention,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            hash_prefix: "remix".to_string(),
            scoped_name: "[name]__[local]___[hash]".to_string(),
            hash_length: 5,
            locals_convention: LocalsConvention::CamelCase,
        }
    }
}
