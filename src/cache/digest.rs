//! Content hashing for cache validation
//!
//! A digest identifies one version of a file's bytes. Same bytes = same
//! digest, regardless of where the file lives or what it is called.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a rendered digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA256 of a file's raw bytes, rendered as lowercase hex
///
/// The empty digest (the `Default`) never matches real content, so a
/// persisted entry with a missing digest field always reads as stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hash a byte slice
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Full hex rendering
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase prefix of `len` hex characters, used for asset file names
    pub fn prefix(&self, len: usize) -> String {
        let end = len.min(self.0.len());
        self.0[..end].to_ascii_uppercase()
    }

    /// Short lowercase form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
