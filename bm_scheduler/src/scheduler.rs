use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::unbounded;

use crate::queue::Recurrence;
use crate::queue::ScheduledTask;
use crate::queue::TaskFn;
use crate::queue::TaskQueue;

/// Longest delay accepted; larger delays are clamped
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 3600);

/// Requests sent from handles to the scheduler thread
enum SchedulerCommand {
    Schedule { delay: Duration, priority: u32, name: String, recurrence: Recurrence, action: TaskFn },
    Stop,
}

/// Convert a delay in seconds to a `Duration`, treating negative or NaN delays as "run now"
pub fn delay_from_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(MAX_DELAY).min(MAX_DELAY)
}

/// Cloneable handle for submitting work to a [`Scheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: Sender<SchedulerCommand>,
    stopped: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Run `action` once, no earlier than `delay` from now
    pub fn schedule<F>(&self, name: &str, delay: Duration, priority: u32, action: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.submit(name, delay, priority, Recurrence::Once, Box::new(action));
    }

    /// Run `action` after `interval`, then again `interval` after each run finishes, whatever its outcome
    pub fn schedule_recurring<F>(&self, name: &str, interval: Duration, priority: u32, action: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.submit(name, interval, priority, Recurrence::FixedDelay(interval.min(MAX_DELAY)), Box::new(action));
    }

    /// Halt the run loop and discard outstanding tasks. Idempotent.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            tracing::info!("Scheduler stop requested");
            let _ = self.command_tx.send(SchedulerCommand::Stop);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn submit(&self, name: &str, delay: Duration, priority: u32, recurrence: Recurrence, action: TaskFn) {
        if self.is_stopped() {
            tracing::debug!(task = name, "Scheduler stopped, task dropped");
            return;
        }
        let command = SchedulerCommand::Schedule { delay: delay.min(MAX_DELAY), priority, name: name.to_string(), recurrence, action };
        if self.command_tx.send(command).is_err() {
            tracing::warn!(task = name, "Scheduler thread gone, task dropped");
        }
    }
}

/// Owns the scheduler thread
pub struct Scheduler {
    handle: SchedulerHandle,
    command_rx: Receiver<SchedulerCommand>,
    poll_interval: Duration,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler; tasks may be submitted before [`Scheduler::start`] and run once it starts
    pub fn new(poll_interval: Duration) -> Self {
        let (command_tx, command_rx) = unbounded();
        let handle = SchedulerHandle { command_tx, stopped: Arc::new(AtomicBool::new(false)) };
        Self { handle, command_rx, poll_interval: poll_interval.max(Duration::from_millis(1)), thread: None }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Spawn the scheduler thread. Calling it again is a no-op.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let command_rx = self.command_rx.clone();
        let stopped = Arc::clone(&self.handle.stopped);
        let poll_interval = self.poll_interval;
        let thread = std::thread::Builder::new().name("scheduler".to_string()).spawn(move || run_loop(command_rx, poll_interval, stopped))?;
        self.thread = Some(thread);
        Ok(())
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Wait for the thread to exit; the task in flight, if any, completes first
    pub fn join(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Scheduler thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.handle.stop();
        self.join_thread();
    }
}

fn run_loop(command_rx: Receiver<SchedulerCommand>, poll_interval: Duration, stopped: Arc<AtomicBool>) {
    let mut queue = TaskQueue::new();
    tracing::info!("Scheduler thread started");

    'outer: loop {
        let timeout = queue.next_due().map_or(poll_interval, |due| due.saturating_duration_since(Instant::now()).min(poll_interval));

        let mut batch = Vec::new();
        match command_rx.recv_timeout(timeout) {
            Ok(command) => batch.push(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        batch.extend(command_rx.try_iter());

        // One timestamp per batch: equal delays tie on run_at and order by priority
        let now = Instant::now();
        for command in batch {
            if !apply(&mut queue, command, now) {
                break 'outer;
            }
        }

        if stopped.load(Ordering::Acquire) {
            break;
        }

        run_due(&mut queue, &stopped);
    }

    let discarded = queue.clear();
    tracing::info!(discarded, "Scheduler thread exiting");
}

/// Enqueue relative to `now`; returns false when the loop must exit
fn apply(queue: &mut TaskQueue, command: SchedulerCommand, now: Instant) -> bool {
    match command {
        SchedulerCommand::Schedule { delay, priority, name, recurrence, action } => {
            let run_at = now.checked_add(delay).unwrap_or(now);
            tracing::debug!(task = %name, delay_ms = delay.as_millis() as u64, priority, "Task scheduled");
            queue.push(run_at, priority, name, recurrence, action);
            true
        }
        SchedulerCommand::Stop => false,
    }
}

fn run_due(queue: &mut TaskQueue, stopped: &AtomicBool) {
    while !stopped.load(Ordering::Acquire) {
        let Some(task) = queue.pop_due(Instant::now()) else {
            break;
        };
        let ScheduledTask { priority, name, recurrence, mut action, .. } = task;

        execute(&name, &mut action);

        if let Recurrence::FixedDelay(interval) = recurrence {
            let now = Instant::now();
            queue.push(now.checked_add(interval).unwrap_or(now), priority, name, recurrence, action);
        }
    }
}

/// Run one task, containing both returned errors and panics
fn execute(name: &str, action: &mut TaskFn) {
    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| action())) {
        Ok(Ok(())) => {
            tracing::debug!(task = name, elapsed_ms = started.elapsed().as_millis() as u64, "Task completed");
        }
        Ok(Err(err)) => {
            tracing::error!(task = name, "Task failed: {err:#}");
        }
        Err(payload) => {
            tracing::error!(task = name, "Task panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_from_secs_normalizes() {
        assert_eq!(delay_from_secs(-5.0), Duration::ZERO);
        assert_eq!(delay_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(delay_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(delay_from_secs(f64::INFINITY), MAX_DELAY);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let scheduler = Scheduler::new(Duration::from_millis(10));
        let handle = scheduler.handle();
        handle.stop();
        handle.stop();
        scheduler.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_schedule_after_stop_is_dropped() {
        let scheduler = Scheduler::new(Duration::from_millis(10));
        let handle = scheduler.handle();
        handle.stop();
        handle.schedule("late", Duration::ZERO, 0, || Ok(()));
        // Only the stop command is waiting
        assert_eq!(scheduler.command_rx.len(), 1);
    }

    fn submission(name: &str, delay: Duration, priority: u32) -> SchedulerCommand {
        SchedulerCommand::Schedule { delay, priority, name: name.to_string(), recurrence: Recurrence::Once, action: Box::new(|| Ok(())) }
    }

    #[test]
    fn test_batch_with_equal_delays_orders_by_priority() {
        let now = Instant::now();
        let mut queue = TaskQueue::new();
        assert!(apply(&mut queue, submission("priority-2", Duration::ZERO, 2), now));
        assert!(apply(&mut queue, submission("priority-1", Duration::ZERO, 1), now));
        assert!(apply(&mut queue, submission("later", Duration::from_millis(1), 0), now));

        let order: Vec<String> = std::iter::from_fn(|| queue.pop_due(now + Duration::from_secs(1))).map(|task| task.name).collect();
        assert_eq!(order, vec!["priority-1", "priority-2", "later"]);
    }

    #[test]
    fn test_stop_command_ends_batch() {
        let mut queue = TaskQueue::new();
        assert!(!apply(&mut queue, SchedulerCommand::Stop, Instant::now()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
