//! Command-line interface parsing for webcache
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into a cache configuration plus the command to run.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{default_cache_dir, CacheConfig, CacheError, FetchOrGetError};
use crate::fetch::{FetchError, HttpFetcher};

/// Error types for the webcache binary
#[derive(Debug, Error)]
pub enum CliError {
    /// The cache directory could not be used
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A fetch through the cache failed
    #[error(transparent)]
    Fetch(#[from] FetchOrGetError<FetchError>),

    /// Entry listing could not be encoded
    #[error("Failed to encode entry list: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing to stdout failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// webcache - Fetch URLs through a local disk cache
#[derive(Parser, Debug)]
#[command(name = "webcache")]
#[command(about = "Threadsafe disk cache for HTTP(S) URL fetches")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache entries (defaults to the platform cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch one or more URLs, serving repeats from the cache
    ///
    /// Bodies are written to stdout in argument order.
    Fetch {
        /// URLs to fetch
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Always hit the network and leave the cache untouched
        #[arg(long)]
        no_cache: bool,

        /// Milliseconds to wait before each network request
        #[arg(long, value_name = "MS")]
        throttle_ms: Option<u64>,

        /// Fail when a response body contains this text
        #[arg(long, value_name = "TEXT")]
        reject_marker: Option<String>,
    },
    /// Report whether a URL is cached (exit code 1 when it is not)
    Contains {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Print the path of the cache entry for a URL
    Path {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Remove the cache entry for a URL
    Invalidate {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Remove every cache entry
    Clear,
    /// List cache entries
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Builds the cache configuration described by the arguments
    pub fn cache_config(&self) -> CacheConfig {
        let cache_dir = self.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let config = CacheConfig::with_dir(cache_dir);
        match &self.command {
            Command::Fetch { no_cache: true, .. } => config.disabled(),
            _ => config,
        }
    }

    /// Builds the HTTP fetcher for a `fetch` command, if that is the command
    pub fn fetcher(&self) -> Option<HttpFetcher> {
        let Command::Fetch {
            throttle_ms,
            reject_marker,
            ..
        } = &self.command
        else {
            return None;
        };

        let mut fetcher = HttpFetcher::new();
        if let Some(ms) = throttle_ms {
            fetcher = fetcher.with_throttle(Duration::from_millis(*ms));
        }
        if let Some(marker) = reject_marker {
            fetcher = fetcher.with_rejection_marker(marker.clone());
        }
        Some(fetcher)
    }
}
