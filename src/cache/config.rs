//! Cache configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory used when no platform cache directory can be determined
const FALLBACK_CACHE_DIR: &str = ".webcache";

/// Settings for a [`CacheManager`](super::CacheManager)
///
/// Each manager owns its own configuration, so independent caches (e.g. in
/// tests) never interfere with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory where cache entries are stored
    pub cache_dir: PathBuf,
    /// When false, fetches bypass the cache entirely
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Creates an enabled configuration rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            enabled: true,
        }
    }

    /// Returns the same configuration with caching switched off
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Returns the XDG-compliant cache directory for webcache
///
/// Uses `~/.cache/webcache/` on Linux, or the equivalent on other platforms.
/// Falls back to `./.webcache` when no home directory is known.
pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "webcache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_enabled() {
        let config = CacheConfig::default();
        assert!(config.enabled);
    }

    #[test]
    fn test_default_dir_mentions_project() {
        let path = default_cache_dir();
        assert!(
            path.to_string_lossy().contains("webcache"),
            "Cache path should contain project name"
        );
    }

    #[test]
    fn test_with_dir_and_disabled() {
        let config = CacheConfig::with_dir("/tmp/somewhere").disabled();
        assert_eq!(config.cache_dir(), Path::new("/tmp/somewhere"));
        assert!(!config.enabled);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = CacheConfig::with_dir("/var/cache/webcache");
        let json = serde_json::to_string(&config).expect("Failed to serialize config");
        let back: CacheConfig = serde_json::from_str(&json).expect("Failed to deserialize config");
        assert_eq!(back, config);
    }
}
