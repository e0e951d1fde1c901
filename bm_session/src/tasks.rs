//! Background work registered with the scheduler at startup

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::reply::Keyboard;
use crate::services::Services;
use crate::services::UpdateStatus;
use crate::services::UpdateTarget;
use crate::state::Identity;
use crate::views;

/// Replies to something the user just asked for
pub const PRIORITY_USER: u32 = 0;
pub const PRIORITY_STATUS: u32 = 1;
pub const PRIORITY_SNAPSHOT: u32 = 2;
pub const PRIORITY_UPDATE_CHECK: u32 = 3;

/// How often each periodic task runs; `None` disables it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskIntervals {
    pub status_poll: Duration,
    pub snapshot: Option<Duration>,
    pub update_check: Option<Duration>,
}

impl Default for TaskIntervals {
    fn default() -> Self {
        Self { status_poll: Duration::from_secs(30), snapshot: None, update_check: Some(Duration::from_secs(6 * 60 * 60)) }
    }
}

/// Last observed running state of the trading bot, shared by every task that checks it
#[derive(Debug, Default)]
pub struct ProcessWatch {
    last: Mutex<Option<bool>>,
}

impl ProcessWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `running`; returns the previous state when this is a change from a known state
    pub fn observe(&self, running: bool) -> Option<bool> {
        let mut last = self.last.lock();
        let previous = last.replace(running);
        previous.filter(|&previous| previous != running)
    }

    pub fn last(&self) -> Option<bool> {
        *self.last.lock()
    }
}

/// Register the startup notice and the periodic tasks reporting to `identity`
pub fn register_tasks(services: &Services, watch: &Arc<ProcessWatch>, identity: Identity, intervals: TaskIntervals) {
    let scheduler = &services.scheduler;

    let notice = services.clone();
    let startup_watch = Arc::clone(watch);
    scheduler.schedule("startup_notice", Duration::ZERO, PRIORITY_USER, move || {
        let running = notice.process.is_running();
        startup_watch.observe(running);
        let status = notice.strings.lookup(if running { "status.running" } else { "status.not_running" }, &[]);
        let fragments = vec![views::text(&*notice.strings, "manager.started", &[("status", status)])];
        notice.send_fragments(identity, &fragments, Keyboard::Main)
    });

    let status = services.clone();
    let status_watch = Arc::clone(watch);
    scheduler.schedule_recurring("status_watch", intervals.status_poll, PRIORITY_STATUS, move || {
        let running = status.process.is_running();
        if status_watch.observe(running).is_some() {
            let key = if running { "watch.started" } else { "watch.stopped" };
            tracing::warn!(running, "Trade bot state changed outside the console");
            status.sender.send_message(identity, views::text(&*status.strings, key, &[]), Keyboard::Unchanged);
        }
        Ok(())
    });

    if let Some(interval) = intervals.snapshot {
        let snapshot = services.clone();
        scheduler.schedule_recurring("balance_snapshot", interval, PRIORITY_SNAPSHOT, move || {
            let balances = snapshot.data.balances()?;
            if balances.is_empty() {
                return Ok(());
            }
            let fragments = views::current_value(&*snapshot.strings, &balances)?;
            snapshot.send_fragments(identity, &fragments, Keyboard::Unchanged)
        });
    }

    if let Some(interval) = intervals.update_check {
        let updates = services.clone();
        let mut announced: HashMap<UpdateTarget, u32> = HashMap::new();
        scheduler.schedule_recurring("update_check", interval, PRIORITY_UPDATE_CHECK, move || {
            for target in [UpdateTarget::Manager, UpdateTarget::TradeBot] {
                match updates.updater.check(target)? {
                    UpdateStatus::UpToDate => {
                        announced.remove(&target);
                    }
                    UpdateStatus::Available { commits } => {
                        if announced.insert(target, commits) == Some(commits) {
                            continue;
                        }
                        tracing::info!(?target, commits, "Update available");
                        let params = [("target", updates.target_name(target)), ("commits", commits.to_string())];
                        updates.sender.send_message(identity, views::text(&*updates.strings, "update.notice", &params), Keyboard::Unchanged);
                    }
                }
            }
            Ok(())
        });
    }

    tracing::info!(%identity, ?intervals, "Scheduled tasks registered");
}
