use crate::crawler::{Story, StoryId};
use crate::storage::StorageError;
use crate::FetchError;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Why a single URL could not be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Connection,
    HttpStatus(u16),
    Decode,
    Storage,
    /// Shutdown was requested before the fetch started
    Cancelled,
    /// The download task died before producing a result
    Aborted,
}

impl FailureKind {
    /// Coarse failure category used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout | Self::Connection => "transport",
            Self::HttpStatus(_) | Self::Decode => "protocol",
            Self::Storage => "storage",
            Self::Cancelled | Self::Aborted => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::HttpStatus(code) => write!(f, "http {}", code),
            Self::Decode => write!(f, "decode"),
            Self::Storage => write!(f, "storage"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl From<&FetchError> for FailureKind {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Timeout(_) => Self::Timeout,
            FetchError::Connection(_) => Self::Connection,
            FetchError::HttpStatus(code) => Self::HttpStatus(*code),
            FetchError::Decode(_) => Self::Decode,
        }
    }
}

/// Outcome of downloading one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success {
        bytes_written: u64,
        /// File name of the artifact inside the story directory
        artifact: String,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

/// Result of one fetch-and-persist task
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: Url,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn success(url: Url, bytes_written: u64, artifact: String) -> Self {
        Self {
            url,
            outcome: DownloadOutcome::Success {
                bytes_written,
                artifact,
            },
        }
    }

    pub fn failure(url: Url, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url,
            outcome: DownloadOutcome::Failure {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn fetch_failed(url: Url, error: &FetchError) -> Self {
        Self::failure(url, error.into(), error.to_string())
    }

    pub fn storage_failed(url: Url, error: &StorageError) -> Self {
        Self::failure(url, FailureKind::Storage, error.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Success { .. })
    }

    pub fn bytes_written(&self) -> u64 {
        match self.outcome {
            DownloadOutcome::Success { bytes_written, .. } => bytes_written,
            DownloadOutcome::Failure { .. } => 0,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            DownloadOutcome::Success { .. } => None,
            DownloadOutcome::Failure { kind, .. } => Some(kind),
        }
    }
}

/// Everything that happened while downloading one story
#[derive(Debug, Clone)]
pub struct StoryDownloadSummary {
    pub story_id: StoryId,
    /// The discussion page itself
    pub page_outcome: DownloadResult,
    /// The story's own target, when that download is enabled
    pub story_url_outcome: Option<DownloadResult>,
    /// One entry per distinct link found in the comments
    pub link_outcomes: Vec<DownloadResult>,
}

impl StoryDownloadSummary {
    /// Summary for a story whose discussion page could not be processed
    pub fn page_failed(story_id: StoryId, page_outcome: DownloadResult) -> Self {
        Self {
            story_id,
            page_outcome,
            story_url_outcome: None,
            link_outcomes: Vec::new(),
        }
    }

    /// Summary for a story that never started because of shutdown
    pub fn cancelled(story: &Story) -> Self {
        Self::page_failed(
            story.id,
            DownloadResult::failure(
                story.comment_page_url.clone(),
                FailureKind::Cancelled,
                "shutdown requested before download started",
            ),
        )
    }

    /// Summary for a story whose download task panicked
    pub fn aborted(story: &Story, message: impl Into<String>) -> Self {
        Self::page_failed(
            story.id,
            DownloadResult::failure(
                story.comment_page_url.clone(),
                FailureKind::Aborted,
                message,
            ),
        )
    }

    pub fn is_page_success(&self) -> bool {
        self.page_outcome.is_success()
    }

    pub fn links_succeeded(&self) -> usize {
        self.link_outcomes.iter().filter(|r| r.is_success()).count()
    }

    pub fn links_failed(&self) -> usize {
        self.link_outcomes.len() - self.links_succeeded()
    }

    /// Number of artifacts saved for this story, page included
    pub fn artifacts_saved(&self) -> usize {
        std::iter::once(&self.page_outcome)
            .chain(self.story_url_outcome.iter())
            .chain(self.link_outcomes.iter())
            .filter(|r| r.is_success())
            .count()
    }

    pub fn bytes_written(&self) -> u64 {
        std::iter::once(&self.page_outcome)
            .chain(self.story_url_outcome.iter())
            .chain(self.link_outcomes.iter())
            .map(DownloadResult::bytes_written)
            .sum()
    }
}

/// What one poll cycle discovered and how its downloads ended
///
/// Emitted once every story dispatched by the cycle has finished, or right
/// away when the cycle found nothing new.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub cycle_started_at: DateTime<Utc>,
    pub new_story_count: usize,
    pub per_story_results: Vec<StoryDownloadSummary>,
    /// Set when the front page could not be fetched this cycle
    pub poll_error: Option<String>,
}

impl CycleReport {
    pub fn pages_failed(&self) -> usize {
        self.per_story_results
            .iter()
            .filter(|s| !s.is_page_success())
            .count()
    }

    pub fn links_succeeded(&self) -> usize {
        self.per_story_results
            .iter()
            .map(StoryDownloadSummary::links_succeeded)
            .sum()
    }

    pub fn links_failed(&self) -> usize {
        self.per_story_results
            .iter()
            .map(StoryDownloadSummary::links_failed)
            .sum()
    }

    /// Writes the report to the log
    pub fn log(&self) {
        if let Some(error) = &self.poll_error {
            tracing::warn!(
                "[cycle {}] Poll failed, no new stories this cycle: {}",
                self.cycle,
                error
            );
            return;
        }

        tracing::info!(
            "[cycle {}] Finished: {} new stories, {} pages failed, {} links saved, {} links failed",
            self.cycle,
            self.new_story_count,
            self.pages_failed(),
            self.links_succeeded(),
            self.links_failed()
        );
    }
}
