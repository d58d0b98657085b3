//! Single-flight transform coordination
//!
//! The coordinator owns the process-wide index from content digest to the
//! computation producing its [`CacheEntry`]. The first request for a digest
//! registers a shared future under the index lock; every later request for
//! the same bytes, concurrent or not, awaits that same future. The transform
//! therefore runs at most once per distinct content per process.
//!
//! # Lookup order
//!
//! | Step | Source | On success |
//! |------|--------|------------|
//! | 1 | In-memory index (by digest) | Join existing computation |
//! | 2 | Persistent store (by path key) | Reuse if digest matches |
//! | 3 | Style transform | Write through to store |
//!
//! Outcomes, failures included, stay in the index for the coordinator's
//! lifetime. A fresh coordinator starts empty and refills from the store.

use crate::cache::digest::ContentDigest;
use crate::cache::store::{CacheEntry, CacheKey, CacheStore, Lookup};
use crate::error::{CssModError, CssModResult};
use crate::transform::{StyleTransform, TransformError};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info, warn};

type Outcome = Result<Arc<CacheEntry>, TransformError>;
type Flight = Shared<BoxFuture<'static, Outcome>>;

#[derive(Debug, Default)]
struct Counters {
    transforms: AtomicU64,
    persistent_hits: AtomicU64,
    joins: AtomicU64,
}

/// Point-in-time view of what the coordinator has done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Style transform executions
    pub transforms: u64,
    /// Computations satisfied by a valid persistent entry
    pub persistent_hits: u64,
    /// Requests that joined an existing computation
    pub joins: u64,
}

/// Deduplicates transform work by content digest
pub struct DedupCoordinator {
    store: Arc<dyn CacheStore>,
    transform: Arc<dyn StyleTransform>,
    flights: Mutex<HashMap<ContentDigest, Flight>>,
    counters: Arc<Counters>,
}

impl DedupCoordinator {
    /// Create a coordinator with an empty index
    pub fn new(store: Arc<dyn CacheStore>, transform: Arc<dyn StyleTransform>) -> Self {
        Self {
            store,
            transform,
            flights: Mutex::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Get the cache entry for the current contents of `path`
    ///
    /// Fails only when the file cannot be read or the transform rejects it.
    /// Store failures are logged and treated as misses.
    pub async fn obtain(&self, path: &Path, key: &CacheKey) -> CssModResult<Arc<CacheEntry>> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| CssModError::read(path, e))?;
        let digest = ContentDigest::of(&bytes);

        self.join_or_start(digest, path, key, bytes)
            .await
            .map_err(|source| CssModError::Transform {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Insert-if-absent on the index; lookup and registration share one lock
    fn join_or_start(
        &self,
        digest: ContentDigest,
        path: &Path,
        key: &CacheKey,
        bytes: Vec<u8>,
    ) -> Flight {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);

        match flights.entry(digest) {
            Entry::Occupied(existing) => {
                self.counters.joins.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Joining computation {} for {}",
                    existing.key().short(),
                    path.display()
                );
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let job = Job {
                    digest: slot.key().clone(),
                    path: path.to_path_buf(),
                    key: key.clone(),
                    bytes,
                    store: Arc::clone(&self.store),
                    transform: Arc::clone(&self.transform),
                    counters: Arc::clone(&self.counters),
                };
                let flight = job.run().boxed().shared();
                slot.insert(flight.clone());
                flight
            }
        }
    }

    /// Counters since construction
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            transforms: self.counters.transforms.load(Ordering::Relaxed),
            persistent_hits: self.counters.persistent_hits.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
        }
    }

    /// Number of distinct digests seen
    pub fn len(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no digest has been requested yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one computation needs, owned so the future is `'static`
struct Job {
    digest: ContentDigest,
    path: PathBuf,
    key: CacheKey,
    bytes: Vec<u8>,
    store: Arc<dyn CacheStore>,
    transform: Arc<dyn StyleTransform>,
    counters: Arc<Counters>,
}

impl Job {
    async fn run(self) -> Outcome {
        match self.store.get(&self.key).await {
            Lookup::Hit(entry) if entry.digest == self.digest => {
                self.counters.persistent_hits.fetch_add(1, Ordering::Relaxed);
                debug!("Persistent cache hit for {}", self.key);
                return Ok(Arc::new(entry));
            }
            Lookup::Hit(stale) => debug!(
                "Persistent entry for {} is stale ({} != {})",
                self.key,
                stale.digest.short(),
                self.digest.short()
            ),
            Lookup::Miss => debug!("Persistent cache miss for {}", self.key),
            Lookup::Unavailable(reason) => {
                warn!("Persistent cache unavailable for {}: {}", self.key, reason)
            }
        }

        let Job {
            digest,
            path,
            key,
            bytes,
            store,
            transform,
            counters,
        } = self;

        counters.transforms.fetch_add(1, Ordering::Relaxed);
        let display_path = path.display().to_string();
        let output = tokio::task::spawn_blocking(move || {
            let source =
                std::str::from_utf8(&bytes).map_err(|e| TransformError::not_utf8(&bytes, &e))?;
            transform.transform(source, &path)
        })
        .await
        .map_err(|e| TransformError::new(format!("transform task failed: {}", e), 1, 1))??;

        info!(
            "Transformed {} ({} classes, {})",
            display_path,
            output.class_map.len(),
            digest.short()
        );

        let entry = CacheEntry {
            digest,
            class_map: output.class_map,
            output_text: output.output_text,
        };
        store.put(&key, &entry).await;

        Ok(Arc::new(entry))
    }
}
