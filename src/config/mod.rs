//! Configuration management for cssmod

pub mod schema;

pub use schema::{Config, LocalsConvention, ProjectConfig, TransformConfig};

use crate::error::{CssModError, CssModResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "cssmod.toml";

/// Configuration manager for one project
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Find the project config at or above `start`, or default to `start/cssmod.toml`
    pub fn discover(start: &Path) -> Self {
        let config_path =
            Self::find_local_config(start).unwrap_or_else(|| start.join(CONFIG_FILE_NAME));
        Self { config_path }
    }

    /// Walk up from `start` looking for `cssmod.toml`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Directory that relative project paths are resolved against
    pub fn project_root(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> CssModResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration, failing if the file does not exist
    pub async fn load_required(&self) -> CssModResult<Config> {
        if !self.config_path.exists() {
            return Err(CssModError::ConfigNotFound(self.config_path.clone()));
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CssModResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CssModError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| CssModError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        validate(&config).map_err(|reason| CssModError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> CssModResult<()> {
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CssModError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

fn validate(config: &Config) -> Result<(), String> {
    if config.project.module_suffix.is_empty() {
        return Err("project.module_suffix must not be empty".to_string());
    }
    if config.transform.hash_length == 0 || config.transform.hash_length > 64 {
        return Err("transform.hash_length must be between 1 and 64".to_string());
    }
    if !config.transform.scoped_name.contains("[local]") {
        return Err("transform.scoped_name must contain [local]".to_string());
    }
    Ok(())
}

/// Absolute project directories, resolved against the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub cache_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: &Path, project: &ProjectConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            source_root: root.join(&project.source_root),
            cache_directory: root.join(&project.cache_directory),
            output_directory: root.join(&project.output_directory),
        }
    }
}
