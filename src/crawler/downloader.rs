//! Per-story download pipeline
//!
//! For one story this fetches the discussion page, saves it, extracts the
//! outbound links from its comments and downloads each of them through a
//! bounded pool. Every failure ends up as a [`DownloadResult`]; nothing
//! here returns an error to the caller.

use crate::config::Config;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::parser::LinkExtractor;
use crate::crawler::story::{LinkTask, Story, StoryId};
use crate::output::{DownloadResult, FailureKind, StoryDownloadSummary};
use crate::storage::{artifact_name, ArtifactStore};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default number of simultaneous link downloads per story
pub const DEFAULT_LINK_CONCURRENCY: usize = 8;

/// A fetched page together with the result of persisting it
struct Saved {
    page: FetchedPage,
    result: DownloadResult,
}

/// Downloads one story's discussion page and everything its comments link to
pub struct StoryDownloader {
    fetcher: Arc<dyn Fetcher>,
    store: ArtifactStore,
    extractor: LinkExtractor,
    link_concurrency: usize,
    timeout: Duration,
    download_story_url: bool,
}

impl StoryDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: ArtifactStore, timeout: Duration) -> Self {
        Self {
            fetcher,
            store,
            extractor: LinkExtractor::comments(),
            link_concurrency: DEFAULT_LINK_CONCURRENCY,
            timeout,
            download_story_url: false,
        }
    }

    /// Builds a downloader from the crawler configuration
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        let store = ArtifactStore::new(&config.output.download_dir, config.output.dry_run);
        Self::new(
            fetcher,
            store,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )
        .with_extractor(LinkExtractor::new(&config.endpoints.link_selector))
        .with_link_concurrency(config.crawler.link_concurrency)
        .with_story_url(config.crawler.download_story_url)
    }

    pub fn with_extractor(mut self, extractor: LinkExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_link_concurrency(mut self, limit: usize) -> Self {
        self.link_concurrency = limit.max(1);
        self
    }

    pub fn with_story_url(mut self, enabled: bool) -> Self {
        self.download_story_url = enabled;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Downloads a story
    ///
    /// # Steps
    ///
    /// 1. Fetch and save the discussion page. If that fails the summary
    ///    carries the failure and nothing else is attempted.
    /// 2. Optionally fetch and save the story's own URL.
    /// 3. Extract outbound links from the discussion page.
    /// 4. Fetch and save each link, at most `link_concurrency` at a time.
    ///    Links not yet started when `cancel` fires are reported as
    ///    cancelled; links already fetching run to their timeout.
    pub async fn download(&self, story: &Story, cancel: &CancellationToken) -> StoryDownloadSummary {
        if cancel.is_cancelled() {
            return StoryDownloadSummary::cancelled(story);
        }

        tracing::debug!(
            "[story {}] Downloading discussion page {}",
            story.id,
            story.comment_page_url
        );

        let saved = match self.fetch_and_save(story.id, &story.comment_page_url).await {
            Ok(saved) => saved,
            Err(failed) => return StoryDownloadSummary::page_failed(story.id, failed),
        };

        let story_url_outcome = match &story.story_url {
            Some(url) if self.download_story_url => Some(self.download_link(
                LinkTask {
                    source_story_id: story.id,
                    url: url.clone(),
                },
                cancel,
            )
            .await),
            _ => None,
        };

        let tasks: Vec<LinkTask> = self
            .extractor
            .extract(&saved.page.body, &saved.page.url)
            .map(|url| LinkTask {
                source_story_id: story.id,
                url,
            })
            .collect();

        tracing::debug!("[story {}] Found {} outbound links", story.id, tasks.len());

        let link_outcomes: Vec<DownloadResult> = stream::iter(tasks)
            .map(|task| self.download_link(task, cancel))
            .buffer_unordered(self.link_concurrency)
            .collect()
            .await;

        let summary = StoryDownloadSummary {
            story_id: story.id,
            page_outcome: saved.result,
            story_url_outcome,
            link_outcomes,
        };

        tracing::info!(
            "[story {}] {:?}: {} links saved, {} failed",
            story.id,
            story.title,
            summary.links_succeeded(),
            summary.links_failed()
        );

        summary
    }

    async fn download_link(&self, task: LinkTask, cancel: &CancellationToken) -> DownloadResult {
        if cancel.is_cancelled() {
            return DownloadResult::failure(
                task.url,
                FailureKind::Cancelled,
                "shutdown requested before fetch",
            );
        }

        match self.fetch_and_save(task.source_story_id, &task.url).await {
            Ok(saved) => saved.result,
            Err(failed) => failed,
        }
    }

    /// Fetches one URL and persists it under the story's directory
    async fn fetch_and_save(&self, story_id: StoryId, url: &Url) -> Result<Saved, DownloadResult> {
        let page = match self.fetcher.fetch(url, self.timeout).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    "[story {}] Fetch failed ({}) for {}: {}",
                    story_id,
                    FailureKind::from(&e).category(),
                    url,
                    e
                );
                return Err(DownloadResult::fetch_failed(url.clone(), &e));
            }
        };

        let name = artifact_name(url, page.content_type.as_deref());
        match self.store.save(story_id, &name, &page.body).await {
            Ok(bytes_written) => {
                tracing::debug!(
                    "[story {}] Saved {} ({} bytes) as {}",
                    story_id,
                    url,
                    bytes_written,
                    name
                );
                Ok(Saved {
                    page,
                    result: DownloadResult::success(url.clone(), bytes_written, name),
                })
            }
            Err(e) => {
                tracing::warn!("[story {}] Could not save {}: {}", story_id, url, e);
                Err(DownloadResult::storage_failed(url.clone(), &e))
            }
        }
    }
}
