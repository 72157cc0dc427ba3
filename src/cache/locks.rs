//! Per-key fetch locks
//!
//! Serializes fetches for the same key so only the first caller of a miss
//! pays the network cost. The table holds weak references: a key's mutex
//! lives only while someone holds or waits on it, and dead slots are pruned
//! whenever a new key is inserted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::key::CacheKey;

/// Guard held for the duration of a fetch-and-store for one key
pub type KeyGuard = OwnedMutexGuard<()>;

/// Lazily populated table of per-key async mutexes
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, creating it if nobody else holds one
    fn handle(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = table.get(key.as_str()).and_then(Weak::upgrade) {
            return existing;
        }

        table.retain(|_, slot| slot.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        table.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Waits for exclusive access to `key`
    ///
    /// Locks for distinct keys never block each other.
    pub async fn acquire(&self, key: &CacheKey) -> KeyGuard {
        self.handle(key).lock_owned().await
    }

    /// Number of slots currently in the table, live or not yet pruned
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
