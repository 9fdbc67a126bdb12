//! Poll loop and story dispatch
//!
//! This module handles:
//! - Running one poll cycle every `repeat_interval_secs`
//! - Spawning one download task per new story
//! - Global story concurrency limiting via a semaphore
//! - Collecting per-story summaries into one report per cycle
//! - Graceful shutdown on cancellation

use crate::config::Config;
use crate::crawler::downloader::StoryDownloader;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::story::Story;
use crate::output::{CrawlStats, CycleReport, StoryDownloadSummary};
use crate::state::SchedulerState;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Downloads still outstanding for one poll cycle
struct PendingCycle {
    started_at: DateTime<Utc>,
    new_story_count: usize,
    remaining: usize,
    results: Vec<StoryDownloadSummary>,
}

/// Drives the crawl: poll, dispatch, wait, repeat
///
/// The scheduler never waits for a cycle's downloads before starting the
/// next poll. Downloads of several cycles may overlap; the semaphore keeps
/// the number of stories downloading at once at `story_concurrency`.
pub struct CrawlScheduler {
    frontier: Frontier,
    downloader: Arc<StoryDownloader>,
    story_permits: Arc<Semaphore>,
    interval: Duration,
    state: SchedulerState,
    cycle: u64,
    in_flight: JoinSet<(u64, StoryDownloadSummary)>,
    pending: HashMap<u64, PendingCycle>,
    stats: Arc<CrawlStats>,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
    cancel: CancellationToken,
}

impl CrawlScheduler {
    pub fn new(
        frontier: Frontier,
        downloader: StoryDownloader,
        story_concurrency: usize,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            frontier,
            downloader: Arc::new(downloader),
            story_permits: Arc::new(Semaphore::new(story_concurrency.max(1))),
            interval,
            state: SchedulerState::Idle,
            cycle: 0,
            in_flight: JoinSet::new(),
            pending: HashMap::new(),
            stats: Arc::new(CrawlStats::new()),
            reports: None,
            cancel,
        }
    }

    /// Builds a scheduler, frontier and downloader sharing one fetcher
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        let frontier = Frontier::new(Arc::clone(&fetcher), config)?;
        let downloader = StoryDownloader::from_config(fetcher, config);

        Ok(Self::new(
            frontier,
            downloader,
            config.crawler.story_concurrency,
            Duration::from_secs(config.crawler.repeat_interval_secs),
            cancel,
        ))
    }

    /// Sends every finished cycle report to `reports` as well as the log
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn downloader(&self) -> &StoryDownloader {
        &self.downloader
    }

    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// Number of story tasks not yet joined
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs poll cycles until the cancellation token fires
    ///
    /// On cancellation no new cycle starts, stories still waiting for a
    /// permit are reported as cancelled, and downloads already running are
    /// allowed to finish before this returns.
    ///
    /// # Errors
    ///
    /// Returns the poll error if the very first cycle cannot read the front
    /// page. Later poll failures are reported and retried on the next tick.
    pub async fn run(&mut self) -> Result<(), CrawlError> {
        if self.state == SchedulerState::Stopped {
            return Ok(());
        }

        tracing::info!(
            "Polling every {}s, up to {} stories downloading at once",
            self.interval.as_secs(),
            self.story_permits.available_permits()
        );

        let mut first = true;
        while !self.cancel.is_cancelled() {
            if let Err(e) = self.run_cycle().await {
                if first {
                    tracing::error!("Initial poll failed, giving up: {}", e);
                    self.shutdown().await;
                    return Err(e);
                }
            }
            first = false;
            self.wait_interval().await;
        }

        self.shutdown().await;
        Ok(())
    }

    /// Polls once and dispatches every new story
    ///
    /// Returns the number of stories dispatched. Does not wait for their
    /// downloads.
    pub async fn run_cycle(&mut self) -> Result<usize, CrawlError> {
        self.cycle += 1;
        let cycle = self.cycle;
        let started_at = Utc::now();
        self.stats.cycle_started();
        self.transition(SchedulerState::Polling);

        let polled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("[cycle {}] Shutdown requested during poll", cycle);
                return Ok(0);
            }
            polled = self.frontier.poll() => polled,
        };

        let stories = match polled {
            Ok(stories) => stories,
            Err(e) => {
                self.stats.poll_failed();
                self.transition(SchedulerState::Dispatching);
                self.emit(CycleReport {
                    cycle,
                    cycle_started_at: started_at,
                    new_story_count: 0,
                    per_story_results: Vec::new(),
                    poll_error: Some(e.to_string()),
                });
                self.transition(SchedulerState::Waiting);
                return Err(e);
            }
        };

        let count = stories.len();
        tracing::info!(
            "[cycle {}] {} new stories ({} seen so far)",
            cycle,
            count,
            self.frontier.seen_count()
        );

        self.transition(SchedulerState::Dispatching);
        if stories.is_empty() {
            self.emit(CycleReport {
                cycle,
                cycle_started_at: started_at,
                new_story_count: 0,
                per_story_results: Vec::new(),
                poll_error: None,
            });
        } else {
            self.pending.insert(
                cycle,
                PendingCycle {
                    started_at,
                    new_story_count: count,
                    remaining: count,
                    results: Vec::with_capacity(count),
                },
            );
            for story in stories {
                self.dispatch(cycle, story);
            }
        }
        self.transition(SchedulerState::Waiting);

        Ok(count)
    }

    /// Spawns the download task for one story
    ///
    /// The task first waits for a story permit, giving up with a cancelled
    /// summary if shutdown comes first. The download itself runs in its own
    /// task so that a panic is reported as an aborted story instead of
    /// losing the result.
    fn dispatch(&mut self, cycle: u64, story: Story) {
        let downloader = Arc::clone(&self.downloader);
        let permits = Arc::clone(&self.story_permits);
        let cancel = self.cancel.clone();

        self.stats.story_dispatched();
        tracing::debug!(
            "[cycle {}] Dispatching story {} {:?}",
            cycle,
            story.id,
            story.title
        );

        self.in_flight.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return (cycle, StoryDownloadSummary::cancelled(&story));
                }
                permit = permits.acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                return (
                    cycle,
                    StoryDownloadSummary::aborted(&story, "story permits closed"),
                );
            };

            let task_story = story.clone();
            let download = tokio::spawn(async move {
                let _permit = permit;
                downloader.download(&task_story, &cancel).await
            });

            let summary = match download.await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!("[story {}] Download task failed: {}", story.id, e);
                    StoryDownloadSummary::aborted(&story, e.to_string())
                }
            };
            (cycle, summary)
        });
    }

    /// Sleeps until the next poll, collecting finished downloads meanwhile
    async fn wait_interval(&mut self) {
        let sleep = tokio::time::sleep(self.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = &mut sleep => return,
                Some(joined) = self.in_flight.join_next() => self.handle_joined(joined),
            }
        }
    }

    /// Waits for every dispatched story to finish
    pub async fn wait_for_downloads(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            self.handle_joined(joined);
        }
    }

    async fn shutdown(&mut self) {
        if !self.in_flight.is_empty() {
            tracing::info!(
                "Waiting for {} in-flight stories to finish",
                self.in_flight.len()
            );
        }
        self.wait_for_downloads().await;

        // cycles whose tasks died without reporting
        let mut leftovers: Vec<(u64, PendingCycle)> = self.pending.drain().collect();
        leftovers.sort_by_key(|(cycle, _)| *cycle);
        for (cycle, pending) in leftovers {
            tracing::warn!(
                "[cycle {}] {} stories never reported back",
                cycle,
                pending.remaining
            );
            self.finish_cycle(cycle, pending);
        }

        self.transition(SchedulerState::Stopped);
        tracing::info!("Crawler stopped: {}", self.stats.snapshot());
    }

    fn handle_joined(&mut self, joined: Result<(u64, StoryDownloadSummary), JoinError>) {
        match joined {
            Ok((cycle, summary)) => self.complete(cycle, summary),
            Err(e) => tracing::error!("Story task failed to report: {}", e),
        }
    }

    fn complete(&mut self, cycle: u64, summary: StoryDownloadSummary) {
        self.stats.record_summary(&summary);

        let Some(pending) = self.pending.get_mut(&cycle) else {
            tracing::warn!("[cycle {}] Result for unknown cycle", cycle);
            return;
        };
        pending.results.push(summary);
        pending.remaining = pending.remaining.saturating_sub(1);

        if pending.remaining == 0 {
            if let Some(pending) = self.pending.remove(&cycle) {
                self.finish_cycle(cycle, pending);
            }
        }
    }

    fn finish_cycle(&self, cycle: u64, mut pending: PendingCycle) {
        pending.results.sort_by_key(|s| s.story_id);
        self.emit(CycleReport {
            cycle,
            cycle_started_at: pending.started_at,
            new_story_count: pending.new_story_count,
            per_story_results: pending.results,
            poll_error: None,
        });
    }

    fn emit(&self, report: CycleReport) {
        report.log();
        if let Some(reports) = &self.reports {
            // a dropped receiver only means nobody is listening any more
            let _ = reports.send(report);
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!("Unexpected scheduler transition {} -> {}", self.state, next);
        }
        tracing::trace!("Scheduler {} -> {}", self.state, next);
        self.state = next;
    }
}
