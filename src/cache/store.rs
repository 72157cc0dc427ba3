//! Entry storage backends
//!
//! [`EntryStore`] is the seam between the cache logic and the medium that
//! holds payloads. [`DiskStore`] keeps one file per entry, named after the
//! encoded key, and writes through a temporary file that is renamed into
//! place so readers never see a partial payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::error::CacheError;
use super::key::CacheKey;

/// Prefix for in-progress writes inside the cache directory
const TMP_PREFIX: &str = ".webcache-";
/// Suffix for in-progress writes inside the cache directory
const TMP_SUFFIX: &str = ".tmp";
/// Age after which a leftover temp file is treated as abandoned
const STALE_TMP_AFTER: Duration = Duration::from_secs(60);

/// Metadata about a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Encoded key of the entry
    pub key: String,
    /// Payload size in bytes
    pub size: u64,
    /// When the entry was last written
    pub modified: DateTime<Utc>,
}

/// Backing medium for cache entries
///
/// Implementations must make `put` atomic with respect to `get` and
/// `contains` on the same key.
pub trait EntryStore: Send + Sync {
    /// Ensures the store is ready for use
    fn init(&self) -> Result<(), CacheError>;

    /// Whether an entry exists for `key`
    fn contains(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Reads the payload for `key`, or `None` if absent
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores or overwrites the payload for `key`
    fn put(&self, key: &CacheKey, payload: &[u8]) -> Result<(), CacheError>;

    /// Removes the entry for `key`, returning whether it existed
    fn remove(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Removes every entry
    fn clear(&self) -> Result<(), CacheError>;

    /// Lists stored entries
    fn entries(&self) -> Result<Vec<EntryInfo>, CacheError>;
}

/// Directory-backed entry store
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where entry files are stored
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to the entry file for the given key
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    fn is_tmp_name(name: &str) -> bool {
        name.starts_with(TMP_PREFIX) && name.ends_with(TMP_SUFFIX)
    }

    /// Whether a temp file is old enough that no live `put` can own it
    fn is_stale_tmp(dir_entry: &fs::DirEntry) -> bool {
        dir_entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > STALE_TMP_AFTER)
    }
}

impl EntryStore for DiskStore {
    fn init(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::storage(&self.dir, e))
    }

    fn contains(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::storage(path, e)),
        }
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // Only regular files are entries, same as `contains`
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(CacheError::storage(path, e)),
        }
    }

    fn put(&self, key: &CacheKey, payload: &[u8]) -> Result<(), CacheError> {
        self.init()?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TMP_PREFIX)
            .suffix(TMP_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::storage(&self.dir, e))?;
        if let Err(e) = tmp.write_all(payload).and_then(|()| tmp.as_file().sync_data()) {
            return Err(CacheError::storage(tmp.path(), e));
        }

        // Same directory, so the rename is atomic; a failed persist drops
        // (and deletes) the temp file.
        let path = self.entry_path(key);
        tmp.persist(&path)
            .map_err(|e| CacheError::storage(&path, e.error))?;

        debug!(key = %key, size = payload.len(), "stored cache entry");
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %key, "removed cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::storage(path, e)),
        }
    }

    /// Removes entry files and abandoned temp files
    ///
    /// Files that are not named like entries are left alone, so a cache
    /// pointed at a shared directory never deletes foreign data. Temp files
    /// younger than `STALE_TMP_AFTER` may belong to a `put` in flight (in
    /// this or another process) and are kept.
    fn clear(&self) -> Result<(), CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.init(),
            Err(e) => return Err(CacheError::storage(&self.dir, e)),
        };

        let mut removed = 0usize;
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::storage(&self.dir, e))?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let is_file = dir_entry.file_type().is_ok_and(|t| t.is_file());
            let is_entry = CacheKey::is_valid(name);
            let is_stale_tmp = Self::is_tmp_name(name) && Self::is_stale_tmp(&dir_entry);
            if !is_file || !(is_entry || is_stale_tmp) {
                continue;
            }

            let path = dir_entry.path();
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Raced with another remover
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::storage(path, e)),
            }
        }

        debug!(dir = %self.dir.display(), removed, "cleared cache directory");
        self.init()
    }

    fn entries(&self) -> Result<Vec<EntryInfo>, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::storage(&self.dir, e)),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::storage(&self.dir, e))?;
            let name = dir_entry.file_name();
            let Some(key) = name.to_str().and_then(CacheKey::from_file_name) else {
                continue;
            };

            let meta = match dir_entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::storage(dir_entry.path(), e)),
            };
            let modified = match meta.modified() {
                Ok(time) => DateTime::<Utc>::from(time),
                Err(e) => {
                    warn!(key = %key, error = %e, "modification time unavailable");
                    DateTime::<Utc>::UNIX_EPOCH
                }
            };

            entries.push(EntryInfo {
                key: key.to_string(),
                size: meta.len(),
                modified,
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
