//! # bm_scheduler
//!
//! Runs one-shot and fixed-delay recurring tasks on a dedicated thread.
//!
//! A task that returns an error or panics is logged and isolated; the loop keeps running and a
//! recurring task is still re-enqueued. Tasks run one at a time and there is no timeout on a single
//! run: a task that hangs stalls every task queued behind it.

pub mod queue;
pub mod scheduler;

pub use queue::Recurrence;
pub use queue::ScheduledTask;
pub use queue::TaskFn;
pub use queue::TaskQueue;
pub use scheduler::Scheduler;
pub use scheduler::SchedulerHandle;
pub use scheduler::delay_from_secs;

/// Default upper bound on how long the loop sleeps before re-checking for new work
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
