//! Error types for the cache

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by cache storage operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry is stored for the URL
    #[error("No cache entry for {url}")]
    EntryNotFound { url: String },

    /// Reading, writing or renaming inside the cache directory failed
    #[error("Cache storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the entry is simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::EntryNotFound { .. })
    }
}

/// Errors from [`CacheManager::fetch_or_get`](super::CacheManager::fetch_or_get)
///
/// Keeps "cache broken" apart from "network failed": `Fetch` carries the
/// caller's own error untouched.
#[derive(Debug, Error)]
pub enum FetchOrGetError<E> {
    /// The cache could not read or persist the entry
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The fetch function failed; nothing was cached
    #[error("Fetch failed: {0}")]
    Fetch(E),
}

impl<E> FetchOrGetError<E> {
    /// Returns the fetch error, if that is what this is
    pub fn into_fetch(self) -> Option<E> {
        match self {
            FetchOrGetError::Fetch(e) => Some(e),
            FetchOrGetError::Cache(_) => None,
        }
    }
}
