//! Transform caching and deduplication
//!
//! Two keys address the same data on purpose:
//!
//! - Content digest (SHA256 of the file bytes) keys the in-memory index, so
//!   byte-identical files share one computation within a process.
//! - Cache key (`css-modules@<settings>:<project-relative path>`) keys the
//!   persistent store, so each logical file has exactly one durable slot per
//!   set of transform settings.
//!
//! # Validity
//!
//! | Persistent entry | Current digest | Result |
//! |------------------|----------------|--------|
//! | Missing | any | Transform, write through |
//! | Digest matches | same | Reused as-is |
//! | Digest differs | changed | Transform, overwrite |
//! | Unreadable | any | Transform, write attempted |
//!
//! Entries are never deleted here; stale ones are simply outvoted by the
//! digest check.

pub mod coordinator;
pub mod digest;
pub mod store;

pub use coordinator::{CoordinatorStats, DedupCoordinator};
pub use digest::ContentDigest;
pub use store::{CacheEntry, CacheKey, CacheStore, FsCacheStore, Lookup, StoreStats};
