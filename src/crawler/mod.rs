//! Crawler module for front page polling and story downloads
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with optional retries
//! - Front page discovery of new stories
//! - Comment link extraction
//! - Per-story downloads and the polling scheduler

mod downloader;
mod fetcher;
mod frontier;
mod parser;
mod scheduler;
mod story;

#[cfg(test)]
mod testing;

pub use downloader::{StoryDownloader, DEFAULT_LINK_CONCURRENCY};
pub use fetcher::{build_http_client, FetchedPage, Fetcher, HttpFetcher, RetryingFetcher};
pub use frontier::Frontier;
pub use parser::{LinkExtractor, Links, ALL_LINKS_SELECTOR, COMMENT_LINK_SELECTOR};
pub use scheduler::CrawlScheduler;
pub use story::{LinkTask, Story, StoryId};

use crate::config::Config;
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builds the HTTP fetcher described by the configuration
///
/// Retries are layered on only when `max_retries` is non-zero, and stop
/// once `cancel` fires.
pub fn build_fetcher(
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Arc<dyn Fetcher>, CrawlError> {
    let http = HttpFetcher::with_user_agent(&config.crawler.user_agent)?;

    if config.crawler.max_retries == 0 {
        return Ok(Arc::new(http));
    }

    Ok(Arc::new(
        RetryingFetcher::new(
            http,
            config.crawler.max_retries,
            Duration::from_millis(config.crawler.retry_backoff_ms),
        )
        .with_cancellation(cancel.clone()),
    ))
}

/// Runs the crawler until `cancel` fires
///
/// This is the main entry point. It will:
/// 1. Build the HTTP client
/// 2. Create the download directory (unless in dry-run mode)
/// 3. Poll the front page on every tick and download new stories
/// 4. Drain running downloads once cancelled
///
/// # Errors
///
/// Fails if the client or download directory cannot be set up, or if the
/// first front page poll fails.
pub async fn crawl(config: &Config, cancel: CancellationToken) -> Result<(), CrawlError> {
    let fetcher = build_fetcher(config, &cancel)?;
    let mut scheduler = CrawlScheduler::from_config(config, fetcher, cancel)?;

    let store = scheduler.downloader().store();
    store.prepare().await?;
    if store.is_dry_run() {
        tracing::info!("Dry run: nothing will be written to {}", store.root().display());
    } else {
        tracing::info!("Saving pages under {}", store.root().display());
    }

    scheduler.run().await
}
