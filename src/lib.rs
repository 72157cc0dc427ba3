//! webcache - a thin, threadsafe disk cache for HTTP(S) URL fetches
//!
//! ```no_run
//! use webcache::cache::CacheManager;
//! use webcache::fetch::HttpFetcher;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::configure(".wst_cache")?;
//! let fetcher = HttpFetcher::new();
//! let body = cache
//!     .fetch_or_get("https://example.com/", |url| fetcher.fetch(url))
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod fetch;
