//! In-memory fetcher and fixtures shared by the crawler unit tests

use crate::config::Config;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const TOP_STORIES: &str = "https://hn.test/v0/topstories.json";
pub const ITEM_TEMPLATE: &str = "https://hn.test/v0/item/{id}.json";
pub const COMMENT_TEMPLATE: &str = "https://hn.test/item?id={id}";

#[derive(Clone)]
enum Route {
    Page {
        body: Vec<u8>,
        content_type: Option<String>,
    },
    Fail(FetchError),
}

/// Serves canned responses and records how it was called
///
/// Unknown URLs answer with HTTP 404. Every call sleeps for the configured
/// delay so that concurrency can be observed.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delays: Mutex<HashMap<String, Duration>>,
    delay: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn page(&self, url: &str, body: impl Into<Vec<u8>>, content_type: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Page {
                body: body.into(),
                content_type: Some(content_type.to_string()),
            },
        );
    }

    pub fn html(&self, url: &str, body: &str) {
        self.page(url, body, "text/html; charset=utf-8");
    }

    pub fn json(&self, url: &str, body: &str) {
        self.page(url, body, "application/json");
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Fail(error));
    }

    /// Overrides the delay for a single URL
    pub fn delay_for(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    /// Publishes a front page with the given ranking
    pub fn front_page(&self, ids: &[u64]) {
        let body = serde_json::to_string(ids).unwrap();
        self.json(TOP_STORIES, &body);
    }

    /// Publishes item metadata and a discussion page for a story
    pub fn story(&self, id: u64, comment_html: &str) {
        self.json(
            &item_url(id),
            &format!(
                r#"{{"id":{id},"type":"story","by":"pg","title":"Story {id}","url":"https://story{id}.test/","score":10}}"#
            ),
        );
        self.html(&comment_url(id), comment_html);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(url.as_str())
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match route {
            Some(Route::Page { body, content_type }) => Ok(FetchedPage {
                url: url.clone(),
                body,
                content_type,
            }),
            Some(Route::Fail(error)) => Err(error),
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}

pub fn item_url(id: u64) -> String {
    ITEM_TEMPLATE.replace("{id}", &id.to_string())
}

pub fn comment_url(id: u64) -> String {
    COMMENT_TEMPLATE.replace("{id}", &id.to_string())
}

/// Discussion page whose comments link to each of `links`
pub fn comment_page(links: &[&str]) -> String {
    let comments: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<tr class="athing comtr"><td><span class="commtext c00">see <a href="{}" rel="nofollow">{}</a></span></td></tr>"#,
                link, link
            )
        })
        .collect();
    format!("<html><body><table>{}</table></body></html>", comments)
}

/// Configuration pointing at the scripted endpoints
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.endpoints.top_stories_url = TOP_STORIES.to_string();
    config.endpoints.item_url_template = ITEM_TEMPLATE.to_string();
    config.endpoints.comment_url_template = COMMENT_TEMPLATE.to_string();
    config.crawler.repeat_interval_secs = 1;
    config.crawler.page_limit = 30;
    config.output.dry_run = true;
    config
}
