//! Cache module for memoizing URL fetches on disk
//!
//! Each URL is hashed into a filesystem-safe key and its payload stored as a
//! single file named after that key. Writes go through a temporary file and
//! an atomic rename, and concurrent misses on the same URL are coordinated
//! so only one fetch runs per process.

mod config;
mod error;
mod key;
mod locks;
mod manager;
mod store;

pub use config::{default_cache_dir, CacheConfig};
pub use error::{CacheError, FetchOrGetError};
pub use key::{encode, CacheKey};
pub use manager::CacheManager;
pub use store::{DiskStore, EntryInfo, EntryStore};
