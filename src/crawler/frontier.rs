//! Front page discovery
//!
//! The frontier polls the ranked story list, works out which ids it has not
//! seen yet, fetches their metadata and records them in the [`SeenSet`].

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::story::{Story, StoryId};
use crate::state::SeenSet;
use crate::url::expand_template;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Item metadata as served by the story endpoint
#[derive(Debug, Deserialize)]
struct ItemMetadata {
    id: StoryId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

/// Discovers newly appeared stories
///
/// The frontier is the only owner of the [`SeenSet`]; `poll` takes
/// `&mut self`, so the set has exactly one writer.
pub struct Frontier {
    fetcher: Arc<dyn Fetcher>,
    top_stories_url: Url,
    item_url_template: String,
    comment_url_template: String,
    page_limit: usize,
    metadata_concurrency: usize,
    timeout: Duration,
    seen: SeenSet,
}

impl Frontier {
    /// Creates a frontier with an empty seen set
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher,
            top_stories_url: Url::parse(&config.endpoints.top_stories_url)?,
            item_url_template: config.endpoints.item_url_template.clone(),
            comment_url_template: config.endpoints.comment_url_template.clone(),
            page_limit: config.crawler.page_limit.max(1),
            metadata_concurrency: config.crawler.link_concurrency.max(1),
            timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            seen: SeenSet::new(),
        })
    }

    /// Number of stories discovered so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: StoryId) -> bool {
        self.seen.contains(id)
    }

    /// Read-only copy of the seen set
    pub fn seen_snapshot(&self) -> HashMap<StoryId, DateTime<Utc>> {
        self.seen.snapshot()
    }

    /// Returns the stories that appeared since the previous poll
    ///
    /// # Algorithm
    ///
    /// 1. Fetch the ranked id list and keep the first `page_limit` entries
    /// 2. Drop ids already in the seen set (and repeats within the list)
    /// 3. Fetch metadata for the remaining ids
    /// 4. Record each id whose metadata arrived and return those stories
    ///
    /// # Errors
    ///
    /// Fails only when the ranked list cannot be fetched or decoded; the seen
    /// set is left untouched in that case. A story whose metadata cannot be
    /// fetched is left out of the result and stays eligible for the next
    /// poll.
    pub async fn poll(&mut self) -> Result<Vec<Story>, CrawlError> {
        let ranked = self.fetch_ranked_ids().await?;

        let mut queued = HashSet::new();
        let candidates: Vec<StoryId> = ranked
            .into_iter()
            .take(self.page_limit)
            .filter(|id| !self.seen.contains(*id) && queued.insert(*id))
            .collect();

        if candidates.is_empty() {
            tracing::debug!("No new stories on the front page");
            return Ok(Vec::new());
        }

        tracing::debug!("Fetching metadata for {} new stories", candidates.len());

        let this = &*self;
        let fetched: Vec<(StoryId, Result<Story, CrawlError>)> = stream::iter(candidates)
            .map(|id| async move { (id, this.fetch_story(id).await) })
            .buffered(self.metadata_concurrency)
            .collect()
            .await;

        let mut stories = Vec::with_capacity(fetched.len());
        for (id, result) in fetched {
            match result {
                Ok(story) => {
                    if self.seen.insert(id, story.discovered_at) {
                        stories.push(story);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping story {} until next poll: {}", id, e);
                }
            }
        }

        Ok(stories)
    }

    async fn fetch_ranked_ids(&self) -> Result<Vec<StoryId>, CrawlError> {
        let page = self
            .fetcher
            .fetch(&self.top_stories_url, self.timeout)
            .await
            .map_err(|source| CrawlError::Fetch {
                url: self.top_stories_url.to_string(),
                source,
            })?;

        serde_json::from_slice(&page.body).map_err(|e| CrawlError::MalformedResponse {
            url: self.top_stories_url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Story, CrawlError> {
        let item_url = expand_template(&self.item_url_template, id)?;
        let malformed = |message: String| CrawlError::MalformedResponse {
            url: item_url.to_string(),
            message,
        };

        let page = self
            .fetcher
            .fetch(&item_url, self.timeout)
            .await
            .map_err(|source| CrawlError::Fetch {
                url: item_url.to_string(),
                source,
            })?;

        let item: Option<ItemMetadata> =
            serde_json::from_slice(&page.body).map_err(|e| malformed(e.to_string()))?;
        let item = item.ok_or_else(|| malformed("item does not exist".to_string()))?;

        if item.id != id {
            return Err(malformed(format!("expected item {}, got {}", id, item.id)));
        }
        if item.deleted || item.dead {
            return Err(malformed("item is deleted or dead".to_string()));
        }
        let title = item
            .title
            .ok_or_else(|| malformed("item has no title".to_string()))?;

        let story_url = item.url.and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Story {} has unusable url {:?}: {}", id, raw, e);
                None
            }
        });

        Ok(Story {
            id,
            title,
            story_url,
            comment_page_url: expand_template(&self.comment_url_template, id)?,
            discovered_at: Utc::now(),
        })
    }
}
