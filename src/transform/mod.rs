//! Style transform seam
//!
//! The cache layer never looks inside a transform: it hands over source
//! text and gets back rewritten text plus a class map, or an error.

pub mod scoped;

pub use scoped::ScopedClassTransform;

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Result of one transform invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Rewritten style text
    pub output_text: String,

    /// Local class name -> generated class name
    pub class_map: BTreeMap<String, String>,
}

/// A transform rejected its input
///
/// Cloneable so every request joined on the same computation can receive
/// its own copy of the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct TransformError {
    /// What went wrong
    pub message: String,
    /// 1-based line of the offending input
    pub line: usize,
    /// 1-based column of the offending input
    pub column: usize,
}

impl TransformError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Error located at a byte offset of `source`
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |pos| pos + 1);
        let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
        Self::new(message, line, column)
    }

    /// Error for input that is not text
    pub fn not_utf8(bytes: &[u8], error: &std::str::Utf8Error) -> Self {
        let valid = std::str::from_utf8(&bytes[..error.valid_up_to()]).unwrap_or_default();
        Self::at(valid, valid.len(), "source is not valid UTF-8")
    }
}

/// Pure function from style source text to `(outputText, classMap)`
///
/// Implementations must be deterministic: the same `source` and `file`
/// always produce the same output.
pub trait StyleTransform: Send + Sync {
    /// Transform the contents of `file`
    fn transform(&self, source: &str, file: &Path) -> Result<TransformOutput, TransformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_position_from_offset() {
        let source = ".a{}\n.b{\n  color: red;";
        let err = TransformError::at(source, source.find("color").unwrap(), "boom");
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert_eq!(err.to_string(), "boom at line 3, column 3");
    }

    #[test]
    fn error_position_start() {
        let err = TransformError::at("", 0, "empty");
        assert_eq!((err.line, err.column), (1, 1));
    }
}
