use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use bm_scheduler::SchedulerHandle;

/// Process-wide shutdown: raises the running flag the session thread polls and stops the scheduler
#[derive(Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    scheduler: SchedulerHandle,
}

impl Shutdown {
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self { requested: Arc::new(AtomicBool::new(false)), scheduler }
    }

    /// Flag to hand to loops that should exit on shutdown
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.requested)
    }

    /// Idempotent
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::AcqRel) {
            tracing::info!("Shutdown requested");
        }
        self.scheduler.stop();
    }
}
