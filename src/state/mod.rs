//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SeenSet`: every story id discovered during this process lifetime
//! - `SchedulerState`: where the polling loop currently is in its cycle

mod scheduler_state;
mod seen_set;

// Re-export main types
pub use scheduler_state::SchedulerState;
pub use seen_set::SeenSet;
