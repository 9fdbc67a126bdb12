use crate::crawler::StoryId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Story ids discovered so far, with the time each was first seen
///
/// The set only grows. It lives for the lifetime of the process and is never
/// persisted, so a restart rediscovers everything on the front page.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    entries: HashMap<StoryId, DateTime<Utc>>,
}

impl SeenSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the id has been discovered before
    pub fn contains(&self, id: StoryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Records a discovery
    ///
    /// Returns false and keeps the original timestamp if the id was already
    /// present.
    pub fn insert(&mut self, id: StoryId, discovered_at: DateTime<Utc>) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, discovered_at);
        true
    }

    /// When the id was first discovered
    pub fn discovered_at(&self, id: StoryId) -> Option<DateTime<Utc>> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a read-only copy of the current contents
    pub fn snapshot(&self) -> HashMap<StoryId, DateTime<Utc>> {
        self.entries.clone()
    }
}
