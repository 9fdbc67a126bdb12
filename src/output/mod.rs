//! Output module for crawl results and statistics
//!
//! This module handles:
//! - Per-URL download results and their aggregation per story
//! - Per-cycle reports handed to logging and observers
//! - Running totals over the lifetime of the process

mod report;
pub mod stats;

pub use report::{CycleReport, DownloadOutcome, DownloadResult, FailureKind, StoryDownloadSummary};
pub use stats::{CrawlStats, StatsSnapshot};
