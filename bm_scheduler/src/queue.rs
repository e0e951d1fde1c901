use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;
use std::time::Instant;

/// Callback executed by the scheduler
pub type TaskFn = Box<dyn FnMut() -> anyhow::Result<()> + Send + 'static>;

/// Whether a task runs once or re-enqueues itself after every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Once,
    /// Run again `interval` after the previous run completed
    FixedDelay(Duration),
}

/// One entry of the task queue
pub struct ScheduledTask {
    pub run_at: Instant,
    pub priority: u32,
    pub name: String,
    pub recurrence: Recurrence,
    pub action: TaskFn,
    seq: u64,
}

impl ScheduledTask {
    fn key(&self) -> (Instant, u32, u64) {
        (self.run_at, self.priority, self.seq)
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("run_at", &self.run_at)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .field("recurrence", &self.recurrence)
            .finish()
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    // Reversed so the max-heap pops the earliest (run_at, priority, seq) first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Min-ordered task queue keyed by `(run_at, priority, insertion sequence)`
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<ScheduledTask>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, returning its sequence number
    pub fn push(&mut self, run_at: Instant, priority: u32, name: impl Into<String>, recurrence: Recurrence, action: TaskFn) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledTask { run_at, priority, name: name.into(), recurrence, action, seq });
        seq
    }

    /// Earliest `run_at` in the queue
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|task| task.run_at)
    }

    /// Remove and return the head of the queue if it is due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<ScheduledTask> {
        if self.heap.peek()?.run_at <= now { self.heap.pop() } else { None }
    }

    /// Drop every entry, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.heap.len();
        self.heap.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
