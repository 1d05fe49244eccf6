//! # Oshin Scheduler
//!
//! Daily wall-clock jobs driven by tokio timers.
//!
//! ```text
//! SchedulerEngine (sleep until next due instant)
//!   ├── DigestJob   "09:30 Asia/Ho_Chi_Minh" → DigestAggregator::run
//!   └── ReminderJob "10:00 Asia/Ho_Chi_Minh" → post reminder text
//! ```

pub mod daily;
pub mod engine;
pub mod jobs;

pub use daily::DailyTime;
pub use engine::{Job, SchedulerEngine};
pub use jobs::{DigestJob, ReminderJob};
