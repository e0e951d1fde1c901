//! In-memory collaborators and a harness wiring them to a real scheduler and real bot files

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bm_scheduler::Scheduler;
use bm_session::ChatSender;
use bm_session::Identity;
use bm_session::Keyboard;
use bm_session::ProcessController;
use bm_session::ProcessWatch;
use bm_session::Services;
use bm_session::Settings;
use bm_session::StateMachine;
use bm_session::StatusProvider;
use bm_session::StringTable;
use bm_session::Strings;
use bm_session::UpdateStatus;
use bm_session::UpdateTarget;
use bm_session::Updater;
use bm_store::BalanceRow;
use bm_store::BotFiles;
use bm_store::ProgressRow;
use bm_store::RatioRow;
use bm_store::StoreError;
use bm_store::TradeRow;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use tempfile::TempDir;

pub const USER: Identity = Identity(42);

pub const SETTLE: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message { identity: Identity, text: String, keyboard: Keyboard },
    Document { identity: Identity, path: PathBuf, caption: String },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Message { text, .. } => text,
            Sent::Document { caption, .. } => caption,
        }
    }
}

pub struct RecordingSender {
    tx: Sender<Sent>,
}

impl ChatSender for RecordingSender {
    fn send_message(&self, identity: Identity, text: String, keyboard: Keyboard) {
        let _ = self.tx.send(Sent::Message { identity, text, keyboard });
    }

    fn send_document(&self, identity: Identity, path: PathBuf, caption: String) {
        let _ = self.tx.send(Sent::Document { identity, path, caption });
    }
}

#[derive(Default)]
pub struct FakeData {
    pub coin: Mutex<Option<String>>,
    pub balances: Mutex<Vec<BalanceRow>>,
    pub ratios: Mutex<Vec<RatioRow>>,
    pub broken: AtomicBool,
}

impl FakeData {
    fn check(&self) -> bm_store::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed { what: "database".to_string(), reason: "unexpected schema".to_string() });
        }
        Ok(())
    }
}

impl StatusProvider for FakeData {
    fn current_coin(&self) -> bm_store::Result<Option<String>> {
        self.check()?;
        Ok(self.coin.lock().clone())
    }

    fn balances(&self) -> bm_store::Result<Vec<BalanceRow>> {
        self.check()?;
        Ok(self.balances.lock().clone())
    }

    fn progress(&self, _limit: usize) -> bm_store::Result<Vec<ProgressRow>> {
        self.check()?;
        Ok(Vec::new())
    }

    fn ratios(&self, _coin: &str) -> bm_store::Result<Vec<RatioRow>> {
        self.check()?;
        Ok(self.ratios.lock().clone())
    }

    fn trade_history(&self, _limit: usize) -> bm_store::Result<Vec<TradeRow>> {
        self.check()?;
        Ok(Vec::new())
    }
}

/// Process that follows start/stop immediately unless told to ignore them
#[derive(Default)]
pub struct FakeProcess {
    pub running: AtomicBool,
    pub ignore_start: AtomicBool,
    pub ignore_stop: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl ProcessController for FakeProcess {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start(&self) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_start.load(Ordering::SeqCst) {
            self.running.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_stop.load(Ordering::SeqCst) {
            self.running.store(false, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUpdater {
    pub available: Mutex<HashMap<UpdateTarget, u32>>,
    pub applied: Mutex<Vec<UpdateTarget>>,
    pub fail_apply: AtomicBool,
}

impl Updater for FakeUpdater {
    fn check(&self, target: UpdateTarget) -> anyhow::Result<UpdateStatus> {
        Ok(match self.available.lock().get(&target) {
            Some(&commits) if commits > 0 => UpdateStatus::Available { commits },
            _ => UpdateStatus::UpToDate,
        })
    }

    fn apply(&self, target: UpdateTarget) -> anyhow::Result<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            anyhow::bail!("merge conflict");
        }
        self.applied.lock().push(target);
        self.available.lock().remove(&target);
        Ok(())
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub files: BotFiles,
    pub data: Arc<FakeData>,
    pub process: Arc<FakeProcess>,
    pub updater: Arc<FakeUpdater>,
    pub strings: StringTable,
    pub outbox: Receiver<Sent>,
    pub services: Services,
    pub watch: Arc<ProcessWatch>,
    pub scheduler: Scheduler,
}

impl Harness {
    /// Collaborators over a temporary bot directory with `user.cfg`, a coin list and a database file
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("user.cfg"), "[binance_user_config]\nbridge=USDT\nscout_multiplier=5\n").unwrap();
        std::fs::write(dir.path().join("supported_coin_list"), "ADA\nETH\n").unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/crypto_trading.db"), b"sqlite").unwrap();

        let files = BotFiles::new(dir.path());
        let data = Arc::new(FakeData::default());
        let process = Arc::new(FakeProcess::default());
        let updater = Arc::new(FakeUpdater::default());
        let strings = StringTable::bundled();
        let (tx, outbox) = unbounded();

        let mut scheduler = Scheduler::new(Duration::from_millis(5));
        scheduler.start().unwrap();

        let services = Services {
            data: data.clone(),
            files: Arc::new(files.clone()),
            process: process.clone(),
            updater: updater.clone(),
            strings: Arc::new(strings.clone()),
            sender: Arc::new(RecordingSender { tx }),
            scheduler: scheduler.handle(),
            settings: Settings { settle_delay: SETTLE, ..Settings::default() },
        };

        Self { dir, files, data, process, updater, strings, outbox, services, watch: Arc::new(ProcessWatch::new()), scheduler }
    }

    pub fn machine(&self) -> StateMachine {
        StateMachine::new(self.services.clone(), Arc::clone(&self.watch))
    }

    pub fn label(&self, button: bm_session::Button) -> String {
        button.label(&self.strings)
    }

    /// Expected paragraph for `key`, as the views render it
    pub fn say(&self, key: &str, params: &[(&str, String)]) -> String {
        bm_session::views::text(&self.strings, key, params)
    }

    pub fn lookup(&self, key: &str) -> String {
        self.strings.lookup(key, &[])
    }

    /// Next message the scheduler or router sent, if any arrives within a second
    pub fn next_sent(&self) -> Option<Sent> {
        self.outbox.recv_timeout(Duration::from_secs(1)).ok()
    }
}
