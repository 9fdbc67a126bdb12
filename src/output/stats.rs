//! Running totals for the lifetime of the crawler process

use crate::output::StoryDownloadSummary;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters, shared between the scheduler and its tasks
#[derive(Debug, Default)]
pub struct CrawlStats {
    cycles: AtomicU64,
    failed_polls: AtomicU64,
    stories_dispatched: AtomicU64,
    stories_completed: AtomicU64,
    pages_failed: AtomicU64,
    links_succeeded: AtomicU64,
    links_failed: AtomicU64,
    bytes_written: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub failed_polls: u64,
    pub stories_dispatched: u64,
    pub stories_completed: u64,
    pub pages_failed: u64,
    pub links_succeeded: u64,
    pub links_failed: u64,
    pub bytes_written: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_started(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn poll_failed(&self) {
        self.failed_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn story_dispatched(&self) {
        self.stories_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds a finished story into the totals
    pub fn record_summary(&self, summary: &StoryDownloadSummary) {
        self.stories_completed.fetch_add(1, Ordering::Relaxed);
        if !summary.is_page_success() {
            self.pages_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.links_succeeded
            .fetch_add(summary.links_succeeded() as u64, Ordering::Relaxed);
        self.links_failed
            .fetch_add(summary.links_failed() as u64, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(summary.bytes_written(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            failed_polls: self.failed_polls.load(Ordering::Relaxed),
            stories_dispatched: self.stories_dispatched.load(Ordering::Relaxed),
            stories_completed: self.stories_completed.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            links_succeeded: self.links_succeeded.load(Ordering::Relaxed),
            links_failed: self.links_failed.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Stories dispatched but not yet finished
    pub fn stories_in_flight(&self) -> u64 {
        self.stories_dispatched.saturating_sub(self.stories_completed)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles ({} failed polls), {} stories dispatched, {} completed, {} pages failed, {} links saved, {} links failed, {} bytes",
            self.cycles,
            self.failed_polls,
            self.stories_dispatched,
            self.stories_completed,
            self.pages_failed,
            self.links_succeeded,
            self.links_failed,
            self.bytes_written
        )
    }
}
