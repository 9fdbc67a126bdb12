//! HTTP fetcher implementation
//!
//! This module handles all network retrieval for the crawler, including:
//! - Building HTTP clients with the configured user agent
//! - Single-attempt GET requests with a per-call timeout
//! - Error classification into transport and protocol failures
//! - Optional bounded retries layered on top of any fetcher

use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum number of redirects followed for a single request
const MAX_REDIRECTS: usize = 10;

/// A successfully retrieved resource
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// Raw response body
    pub body: Vec<u8>,

    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
}

/// Performs single network retrievals
///
/// Implementations make exactly one attempt per call and must honor the
/// timeout, surfacing expiry as [`FetchError::Timeout`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// The client carries no timeouts of its own. Each request sets one, so a
/// [`FetchError::Timeout`] always reports the limit that actually expired.
///
/// # Arguments
///
/// * `user_agent` - Value of the User-Agent header
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(FetchedPage)` |
    /// | Other status | `HttpStatus(code)` |
    /// | Timeout (connect or body) | `Timeout` |
    /// | Connection refused, DNS, TLS, too many redirects | `Connection` |
    /// | Body could not be read | `Decode` |
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Decode(e.to_string())
            }
        })?;

        Ok(FetchedPage {
            url: final_url,
            body: body.to_vec(),
            content_type,
        })
    }
}

/// Maps a reqwest error onto the fetch failure taxonomy
fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() {
        FetchError::Connection(format!("connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::Connection(format!("redirect error: {}", error))
    } else if error.is_decode() || error.is_body() {
        FetchError::Decode(error.to_string())
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Connection(error.to_string())
    }
}

/// Wraps a fetcher with bounded retries for transient failures
///
/// Only failures for which [`FetchError::is_transient`] holds are retried.
/// The delay before attempt `n` is `backoff * n`. Once the cancellation
/// token fires no further attempt is started and the last error is
/// returned.
pub struct RetryingFetcher<F> {
    inner: F,
    max_retries: u32,
    backoff: Duration,
    cancel: CancellationToken,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops retrying when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(url, timeout).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    if self.cancel.is_cancelled() {
                        return Err(e);
                    }
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} after {} (attempt {}/{})",
                        url,
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            tracing::debug!("Shutdown requested, not retrying {}", url);
                            return Err(e);
                        }
                        _ = tokio::time::sleep(self.backoff * attempt) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn fetcher() -> HttpFetcher {
        HttpFetcher::with_user_agent("ycrawler-test/1.0").unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client("ycrawler-test/1.0").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>hello</html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let page = fetcher().fetch(&url, TIMEOUT).await.unwrap();

        assert_eq!(page.body, b"<html>hello</html>");
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(page.url, url);
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher().fetch(&url, TIMEOUT).await.unwrap();
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let result = fetcher().fetch(&url, TIMEOUT).await;
        assert_eq!(result.unwrap_err(), FetchError::HttpStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let timeout = Duration::from_millis(200);
        let result = fetcher().fetch(&url, timeout).await;
        assert_eq!(result.unwrap_err(), FetchError::Timeout(timeout));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // bind then drop a listener to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

        let result = fetcher().fetch(&url, TIMEOUT).await;
        assert!(matches!(result, Err(FetchError::Connection(_))));
    }

    /// Fails with the given error a fixed number of times, then succeeds
    struct Flaky {
        failures: u32,
        error: FetchError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for Flaky {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.error.clone());
            }
            Ok(FetchedPage {
                url: url.clone(),
                body: b"ok".to_vec(),
                content_type: None,
            })
        }
    }

    fn flaky(failures: u32, error: FetchError) -> Flaky {
        Flaky {
            failures,
            error,
            calls: AtomicU32::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let url = Url::parse("https://example.com/").unwrap();
        let fetcher = RetryingFetcher::new(
            flaky(2, FetchError::HttpStatus(503)),
            3,
            Duration::from_millis(1),
        );

        assert!(fetcher.fetch(&url, TIMEOUT).await.is_ok());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_limit() {
        let url = Url::parse("https://example.com/").unwrap();
        let fetcher = RetryingFetcher::new(
            flaky(10, FetchError::Connection("refused".into())),
            2,
            Duration::from_millis(1),
        );

        assert!(fetcher.fetch(&url, TIMEOUT).await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_for_permanent_failure() {
        let url = Url::parse("https://example.com/").unwrap();
        let fetcher = RetryingFetcher::new(
            flaky(1, FetchError::HttpStatus(404)),
            5,
            Duration::from_millis(1),
        );

        assert_eq!(
            fetcher.fetch(&url, TIMEOUT).await.unwrap_err(),
            FetchError::HttpStatus(404)
        );
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_after_cancellation() {
        let url = Url::parse("https://example.com/").unwrap();
        let cancel = CancellationToken::new();
        let fetcher = RetryingFetcher::new(
            flaky(10, FetchError::Connection("refused".into())),
            3,
            Duration::from_millis(300),
        )
        .with_cancellation(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = fetcher.fetch(&url, TIMEOUT).await;

        assert!(matches!(result, Err(FetchError::Connection(_))));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_single_attempt() {
        let url = Url::parse("https://example.com/").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetcher = RetryingFetcher::new(
            flaky(10, FetchError::HttpStatus(503)),
            5,
            Duration::from_millis(1),
        )
        .with_cancellation(cancel);

        assert_eq!(
            fetcher.fetch(&url, TIMEOUT).await.unwrap_err(),
            FetchError::HttpStatus(503)
        );
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }
}
