//! End-to-end cache behaviour against a simulated slow fetch

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use webcache::cache::{CacheManager, FetchOrGetError};

const DELAY: Duration = Duration::from_millis(300);

async fn slow_fetch(url: &str) -> Result<Vec<u8>, io::Error> {
    tokio::time::sleep(DELAY).await;
    Ok(format!("<html>{url}</html>").into_bytes())
}

#[tokio::test]
async fn test_repeat_calls_are_served_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join(".wst_cache");
    let cache = CacheManager::configure(&cache_dir).unwrap();
    cache.clear().unwrap();
    let url = "http://example.com/slow";

    let started = Instant::now();
    let first = cache.fetch_or_get(url, slow_fetch).await.unwrap();
    assert!(started.elapsed() >= DELAY);

    for _ in 0..4 {
        let started = Instant::now();
        let again = cache.fetch_or_get(url, slow_fetch).await.unwrap();
        assert!(started.elapsed() < DELAY / 3, "Cached call should be fast");
        assert_eq!(again, first);
    }

    cache.clear().unwrap();
    assert_eq!(std::fs::read_dir(&cache_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_entries_survive_a_new_manager() {
    let temp_dir = TempDir::new().unwrap();
    let url = "http://example.com/persisted";

    {
        let cache = CacheManager::configure(temp_dir.path()).unwrap();
        cache.fetch_or_get(url, slow_fetch).await.unwrap();
    }

    let reopened = CacheManager::configure(temp_dir.path()).unwrap();
    let started = Instant::now();
    let body = reopened
        .fetch_or_get(url, |_| async { Err::<Vec<u8>, _>(io::Error::other("offline")) })
        .await
        .unwrap();
    assert!(started.elapsed() < DELAY);
    assert_eq!(body, format!("<html>{url}</html>").into_bytes());
}

#[tokio::test]
async fn test_failed_fetch_is_retried_next_time() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::configure(temp_dir.path()).unwrap();
    let url = "http://example.com/flaky";

    let err = cache
        .fetch_or_get(url, |_| async { Err::<Vec<u8>, _>(io::Error::other("reset")) })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchOrGetError::Fetch(_)));

    let body = cache.fetch_or_get(url, slow_fetch).await.unwrap();
    assert!(!body.is_empty());
    assert!(cache.contains(url).unwrap());
}

#[test]
fn test_threads_with_own_runtimes_fetch_once() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(CacheManager::configure(temp_dir.path()).unwrap());
    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap(),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let url = "http://example.com/threads";

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let runtime = Arc::clone(&runtime);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                runtime.block_on(cache.fetch_or_get(url, |u| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    slow_fetch(u)
                }))
            })
        })
        .collect();

    let bodies: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}
