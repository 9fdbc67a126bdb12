//! Story value types handed between the frontier and the downloaders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Identifier of a discussion thread, stable across polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StoryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A story as first observed on the front page
///
/// Immutable once discovered; safe to move into download tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    /// Target of the story; absent for text posts such as "Ask HN"
    pub story_url: Option<Url>,
    pub comment_page_url: Url,
    pub discovered_at: DateTime<Utc>,
}

/// One outbound link waiting to be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTask {
    pub source_story_id: StoryId,
    pub url: Url,
}
