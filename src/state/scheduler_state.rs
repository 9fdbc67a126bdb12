use std::fmt;

/// States of the crawl loop
///
/// The loop starts `Idle` and then cycles through
/// `Polling -> Dispatching -> Waiting -> Polling` until it is cancelled,
/// after which it settles in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Created but not started
    Idle,

    /// Fetching the front page and metadata for new stories
    Polling,

    /// Handing new stories to download tasks
    Dispatching,

    /// Sleeping until the next poll is due
    Waiting,

    /// Cancelled and drained
    Stopped,
}

impl SchedulerState {
    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: SchedulerState) -> bool {
        use SchedulerState::*;

        match (self, next) {
            (Idle, Polling) => true,
            (Polling, Dispatching) => true,
            (Dispatching, Waiting) => true,
            (Waiting, Polling) => true,
            // cancellation is honored from any running state
            (Idle | Polling | Dispatching | Waiting, Stopped) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Dispatching => "dispatching",
            Self::Waiting => "waiting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
