use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for ycrawler
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub endpoints: EndpointConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Polling and download behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Seconds to wait between front page polls
    pub repeat_interval_secs: u64,

    /// How many top-ranked stories to consider per poll
    pub page_limit: usize,

    /// Maximum number of stories downloading at once
    pub story_concurrency: usize,

    /// Maximum number of simultaneous link downloads within one story
    pub link_concurrency: usize,

    /// Timeout applied to every single request
    pub request_timeout_secs: u64,

    /// Extra attempts for transient failures (0 disables retries)
    pub max_retries: u32,

    /// Base delay between retry attempts, grows linearly per attempt
    pub retry_backoff_ms: u64,

    /// Also download the article the story points at
    pub download_story_url: bool,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            repeat_interval_secs: 15,
            page_limit: 30,
            story_concurrency: 4,
            link_concurrency: 8,
            request_timeout_secs: 30,
            max_retries: 0,
            retry_backoff_ms: 1000,
            download_story_url: false,
            user_agent: format!("ycrawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Remote endpoints and page structure
///
/// Templates use `{id}` as the placeholder for the story id.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// JSON array of story ids in front page order
    pub top_stories_url: String,

    /// JSON metadata for a single story
    pub item_url_template: String,

    /// Human readable discussion page for a story
    pub comment_url_template: String,

    /// CSS selector for the outbound links inside the discussion page
    pub link_selector: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            top_stories_url: "https://hacker-news.firebaseio.com/v0/topstories.json".to_string(),
            item_url_template: "https://hacker-news.firebaseio.com/v0/item/{id}.json".to_string(),
            comment_url_template: "https://news.ycombinator.com/item?id={id}".to_string(),
            link_selector: ".commtext a[href]".to_string(),
        }
    }
}

/// Where and whether artifacts are written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory; each story gets its own subdirectory
    pub download_dir: PathBuf,

    /// Run the whole pipeline without writing anything to disk
    pub dry_run: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("pages"),
            dry_run: true,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Append log lines to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// One of trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}
