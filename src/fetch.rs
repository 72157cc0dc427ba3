//! HTTP fetcher used as the default fetch function
//!
//! Wraps a reqwest client that presents itself as a desktop browser, with an
//! optional delay before each request and an optional marker that flags a
//! response body as a rejection page.

use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// User-Agent sent with every request
const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

/// Errors that can occur when fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// Response body contained the rejection marker
    #[error("Rejected, failed to load {url}: response contains {marker:?}")]
    Rejected { url: String, marker: String },
}

/// Client for fetching raw response bodies
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    throttle: Option<Duration>,
    rejection_marker: Option<String>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new HttpFetcher with default settings
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new HttpFetcher with a custom HTTP client
    ///
    /// Requests still carry the browser-like User-Agent.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            throttle: None,
            rejection_marker: None,
        }
    }

    /// Wait this long before sending each request
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Treat any response body containing `marker` as a failure
    pub fn with_rejection_marker(mut self, marker: impl Into<String>) -> Self {
        self.rejection_marker = Some(marker.into());
        self
    }

    /// Fetch the body of `url`
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - The raw response body
    /// * `Err(FetchError)` - If the request fails, the status is not 2xx, or
    ///   the body contains the rejection marker
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(throttle) = self.throttle {
            tokio::time::sleep(throttle).await;
        }

        debug!(%url, "sending request");
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?.to_vec();

        if let Some(marker) = &self.rejection_marker {
            if contains_marker(&body, marker.as_bytes()) {
                return Err(FetchError::Rejected {
                    url: url.to_string(),
                    marker: marker.clone(),
                });
            }
        }

        debug!(%url, size = body.len(), "received response");
        Ok(body)
    }
}

fn contains_marker(body: &[u8], marker: &[u8]) -> bool {
    !marker.is_empty() && body.windows(marker.len()).any(|window| window == marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response per connection and returns the base URL
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/")
    }

    /// Answers every request with the raw request bytes as the body
    async fn serve_echo() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {n}\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&buf[..n]).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/")
    }

    #[test]
    fn test_contains_marker() {
        assert!(contains_marker(b"<html>captcha</html>", b"captcha"));
        assert!(!contains_marker(b"<html>ok</html>", b"captcha"));
        assert!(!contains_marker(b"short", b""));
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let url = serve("200 OK", "hello world").await;
        let body = HttpFetcher::new().fetch(&url).await.unwrap();
        assert_eq!(body, b"hello world");
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let url = serve_echo().await;

        for fetcher in [HttpFetcher::new(), HttpFetcher::with_client(Client::new())] {
            let request = String::from_utf8(fetcher.fetch(&url).await.unwrap()).unwrap();
            let user_agent = request
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("user-agent").then(|| value.trim().to_string())
                })
                .expect("request should carry a User-Agent");
            assert_eq!(user_agent, BROWSER_USER_AGENT);
        }
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let url = serve("404 Not Found", "missing").await;
        let err = HttpFetcher::new().fetch(&url).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejection_marker() {
        let url = serve("200 OK", "please solve this captcha").await;
        let err = HttpFetcher::new()
            .with_rejection_marker("captcha")
            .fetch(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Rejected { .. }));
        assert!(err.to_string().contains("captcha"));
    }

    #[tokio::test]
    async fn test_fetch_throttle_delays_request() {
        let url = serve("200 OK", "slow").await;
        let started = Instant::now();
        HttpFetcher::new()
            .with_throttle(Duration::from_millis(150))
            .fetch(&url)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpFetcher::new()
            .fetch(&format!("http://{addr}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
