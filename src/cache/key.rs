//! Cache key encoding
//!
//! Maps a URL to a stable, filesystem-safe identifier: the lowercase hex
//! SHA-256 digest of the URL's UTF-8 bytes.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of an encoded key in characters
pub const KEY_LEN: usize = 64;

/// Filesystem-safe identifier derived from a URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice, suitable for use as a file name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a file name back into a key if it has the encoded shape
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::is_valid(name).then(|| Self(name.to_string()))
    }

    /// Checks whether `name` looks like an encoded key
    pub fn is_valid(name: &str) -> bool {
        name.len() == KEY_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encodes a URL into its cache key
///
/// Pure and total: equal inputs always produce equal keys, in any process.
pub fn encode(url: &str) -> CacheKey {
    let digest = Sha256::digest(url.as_bytes());
    CacheKey(hex::encode(digest))
}
