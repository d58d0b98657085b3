//! Error types for cssmod
//!
//! All modules use `CssModResult<T>` as their return type.

use crate::transform::TransformError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cssmod operations
pub type CssModResult<T> = Result<T, CssModError>;

/// All errors that can occur in cssmod
#[derive(Error, Debug)]
pub enum CssModError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // Module loading errors
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to transform {path}: {source}")]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    #[error("Failed to write asset {path}: {source}")]
    AssetWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build finished with {0} error(s)")]
    BuildFailed(usize),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CssModError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a source read error
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Whether the error comes from a bad input file rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Transform { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: cssmod config init"),
            Self::ConfigInvalid { .. } => Some("Check the file against: cssmod config show"),
            Self::AssetWrite { .. } => Some("Check that project.output_directory is writable"),
            Self::BuildFailed(_) => Some("Fix the reported files and run the build again"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CssModError::read(
            "/app/a.module.css",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("Failed to read /app/a.module.css"));
    }

    #[test]
    fn error_hint() {
        let err = CssModError::ConfigNotFound(PathBuf::from("cssmod.toml"));
        assert_eq!(err.hint(), Some("Run: cssmod config init"));
    }

    #[test]
    fn input_errors() {
        let err = CssModError::Transform {
            path: PathBuf::from("a.module.css"),
            source: TransformError::new("unclosed block", 1, 5),
        };
        assert!(err.is_input_error());
        assert!(!CssModError::Internal("x".to_string()).is_input_error());
    }
}
