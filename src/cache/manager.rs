//! Cache manager for memoizing URL fetches on disk
//!
//! Provides a `CacheManager` that maps URLs to stored payloads and wraps a
//! caller-supplied fetch function so that repeated requests for the same URL
//! are answered from storage.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::config::CacheConfig;
use super::error::{CacheError, FetchOrGetError};
use super::key::encode;
use super::locks::KeyLocks;
use super::store::{DiskStore, EntryInfo, EntryStore};

/// Memoizing cache in front of a fetch function
///
/// All operations take `&self` and are safe to call from many tasks or
/// threads at once (share it behind an `Arc`). Concurrent misses on the same
/// URL are coordinated by a per-key lock so the fetch function runs once per
/// process; separate processes sharing a directory may fetch redundantly on
/// first access but never corrupt an entry.
#[derive(Debug)]
pub struct CacheManager<S = DiskStore> {
    store: S,
    enabled: AtomicBool,
    locks: KeyLocks,
}

impl CacheManager<DiskStore> {
    /// Creates a cache manager from a configuration
    ///
    /// The cache directory is created if it does not exist yet.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let manager = Self::with_store(DiskStore::new(config.cache_dir), config.enabled)?;
        info!(dir = %manager.store.dir().display(), enabled = config.enabled, "cache configured");
        Ok(manager)
    }

    /// Creates an enabled cache manager rooted at `dir`
    pub fn configure(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::open(CacheConfig::with_dir(dir))
    }

    /// Points the cache at another directory, creating it if absent
    ///
    /// Requires exclusive access, so it cannot race in-flight operations.
    pub fn set_cache_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), CacheError> {
        let store = DiskStore::new(dir);
        store.init()?;
        info!(dir = %store.dir().display(), "cache directory changed");
        self.store = store;
        Ok(())
    }

    /// Directory where entries are stored
    pub fn cache_dir(&self) -> &std::path::Path {
        self.store.dir()
    }

    /// Path of the entry file for `url`, whether or not it exists
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.store.entry_path(&encode(url))
    }

    /// Current configuration snapshot
    pub fn config(&self) -> CacheConfig {
        CacheConfig {
            cache_dir: self.store.dir().to_path_buf(),
            enabled: self.is_enabled(),
        }
    }
}

impl<S: EntryStore> CacheManager<S> {
    /// Creates a cache manager over an arbitrary entry store
    pub fn with_store(store: S, enabled: bool) -> Result<Self, CacheError> {
        store.init()?;
        Ok(Self {
            store,
            enabled: AtomicBool::new(enabled),
            locks: KeyLocks::new(),
        })
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        debug!("cache enabled");
    }

    /// Bypasses the cache: `fetch_or_get` always fetches and leaves entries alone
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        debug!("cache disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Whether an entry is stored for `url`
    pub fn contains(&self, url: &str) -> Result<bool, CacheError> {
        self.store.contains(&encode(url))
    }

    /// Returns the stored payload for `url`
    ///
    /// # Returns
    /// * `Ok(payload)` byte-for-byte as it was stored
    /// * `Err(CacheError::EntryNotFound)` if nothing is stored
    /// * `Err(CacheError::Storage)` if the entry could not be read
    pub fn get(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let key = encode(url);
        match self.store.get(&key)? {
            Some(payload) => {
                debug!(%url, key = %key, "cache hit");
                Ok(payload)
            }
            None => Err(CacheError::EntryNotFound {
                url: url.to_string(),
            }),
        }
    }

    /// Stores or overwrites the payload for `url`
    ///
    /// Readers see either the previous entry or the new one, never a mix.
    pub fn put(&self, url: &str, payload: &[u8]) -> Result<(), CacheError> {
        debug!(%url, "adding to cache");
        self.store.put(&encode(url), payload)
    }

    /// Removes the entry for `url`, returning whether there was one
    pub fn invalidate(&self, url: &str) -> Result<bool, CacheError> {
        let removed = self.store.remove(&encode(url))?;
        debug!(%url, removed, "invalidated cache entry");
        Ok(removed)
    }

    /// Removes every entry and leaves the cache directory in place
    ///
    /// Only entry files (and abandoned temp files) are deleted; anything else
    /// in the directory is not ours and is kept.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.clear()?;
        info!("cache emptied");
        Ok(())
    }

    /// Lists stored entries, sorted by key
    pub fn entries(&self) -> Result<Vec<EntryInfo>, CacheError> {
        self.store.entries()
    }

    /// Number of per-key locks currently tracked
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// Returns the cached payload for `url`, fetching and storing it on a miss
    ///
    /// # Behavior
    /// - Disabled: always calls `fetch` and touches no entries
    /// - Hit: returns the stored payload without calling `fetch`
    /// - Miss: takes the per-key lock, re-checks storage, and only then calls
    ///   `fetch`; the result is stored before it is returned
    ///
    /// A failed fetch stores nothing and its error comes back unchanged as
    /// `FetchOrGetError::Fetch`. A failed store surfaces as
    /// `FetchOrGetError::Cache` even though the fetch itself succeeded.
    pub async fn fetch_or_get<'u, F, Fut, E>(
        &self,
        url: &'u str,
        fetch: F,
    ) -> Result<Vec<u8>, FetchOrGetError<E>>
    where
        F: FnOnce(&'u str) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        if !self.is_enabled() {
            debug!(%url, "cache disabled, fetching directly");
            return fetch(url).await.map_err(FetchOrGetError::Fetch);
        }

        if let Some(payload) = self.lookup(url)? {
            return Ok(payload);
        }

        let key = encode(url);
        let _guard = self.locks.acquire(&key).await;

        // Whoever held the lock before us may have filled the entry
        if let Some(payload) = self.lookup(url)? {
            return Ok(payload);
        }

        debug!(%url, key = %key, "cache miss, fetching");
        let payload = fetch(url).await.map_err(FetchOrGetError::Fetch)?;
        self.store.put(&key, &payload)?;
        Ok(payload)
    }

    /// Reads the entry for `url`, mapping absence to `None`
    fn lookup(&self, url: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.get(url) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
