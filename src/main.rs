//! webcache - Fetch URLs through a local disk cache
//!
//! Command-line front end over the webcache library: fetch URLs with
//! memoization, inspect entries, and empty the cache.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use webcache::cache::CacheManager;
use webcache::cli::{Cli, CliError, Command};

/// Installs a stderr log subscriber filtered by `RUST_LOG`
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("webcache=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs the parsed command, returning whether it succeeded in the
/// command's own terms (e.g. `contains` reports a miss as failure)
async fn run(cli: Cli) -> Result<bool, CliError> {
    let cache = CacheManager::open(cli.cache_config())?;
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Command::Fetch { urls, .. } => {
            let fetcher = cli.fetcher().unwrap_or_default();
            let fetches = urls
                .iter()
                .map(|url| cache.fetch_or_get(url, |u| fetcher.fetch(u)));
            let results = join_all(fetches).await;

            for body in results {
                stdout.write_all(&body?)?;
            }
        }
        Command::Contains { url } => {
            let cached = cache.contains(url)?;
            writeln!(stdout, "{cached}")?;
            return Ok(cached);
        }
        Command::Path { url } => {
            writeln!(stdout, "{}", cache.entry_path(url).display())?;
        }
        Command::Invalidate { url } => {
            let removed = cache.invalidate(url)?;
            let status = if removed { "removed" } else { "not cached" };
            writeln!(stdout, "{status}")?;
        }
        Command::Clear => {
            cache.clear()?;
        }
        Command::List { json } => {
            let entries = cache.entries()?;
            if *json {
                serde_json::to_writer_pretty(&mut stdout, &entries)?;
                writeln!(stdout)?;
            } else {
                for entry in entries {
                    writeln!(
                        stdout,
                        "{}  {:>10}  {}",
                        entry.key,
                        entry.size,
                        entry.modified.format("%Y-%m-%d %H:%M:%S")
                    )?;
                }
            }
        }
    }

    stdout.flush()?;
    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
