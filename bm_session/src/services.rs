//! Collaborators the state machine and scheduled tasks act through

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bm_scheduler::SchedulerHandle;
use bm_store::BalanceRow;
use bm_store::BotFile;
use bm_store::BotFiles;
use bm_store::ProgressRow;
use bm_store::RatioRow;
use bm_store::TradeDb;
use bm_store::TradeRow;

use crate::reply::Keyboard;
use crate::reply::Reply;
use crate::state::Identity;

/// Outbound chat messages. Fire-and-forget: delivery failures are the implementation's to log.
pub trait ChatSender: Send + Sync {
    fn send_message(&self, identity: Identity, text: String, keyboard: Keyboard);

    fn send_document(&self, identity: Identity, path: PathBuf, caption: String);

    /// Send every message of a reply; the keyboard rides on the last one
    fn send_reply(&self, identity: Identity, reply: Reply) {
        let count = reply.messages.len();
        for (index, message) in reply.messages.into_iter().enumerate() {
            let keyboard = if index + 1 == count { reply.keyboard } else { Keyboard::Unchanged };
            self.send_message(identity, message, keyboard);
        }
        if let Some(document) = reply.document {
            self.send_document(identity, document.path, document.caption);
        }
    }
}

/// Read-only queries against the trading bot's state
pub trait StatusProvider: Send + Sync {
    fn current_coin(&self) -> bm_store::Result<Option<String>>;

    fn balances(&self) -> bm_store::Result<Vec<BalanceRow>>;

    fn progress(&self, limit: usize) -> bm_store::Result<Vec<ProgressRow>>;

    fn ratios(&self, coin: &str) -> bm_store::Result<Vec<RatioRow>>;

    fn trade_history(&self, limit: usize) -> bm_store::Result<Vec<TradeRow>>;
}

impl StatusProvider for TradeDb {
    fn current_coin(&self) -> bm_store::Result<Option<String>> {
        TradeDb::current_coin(self)
    }

    fn balances(&self) -> bm_store::Result<Vec<BalanceRow>> {
        TradeDb::balances(self)
    }

    fn progress(&self, limit: usize) -> bm_store::Result<Vec<ProgressRow>> {
        TradeDb::progress(self, limit)
    }

    fn ratios(&self, coin: &str) -> bm_store::Result<Vec<RatioRow>> {
        TradeDb::ratios(self, coin)
    }

    fn trade_history(&self, limit: usize) -> bm_store::Result<Vec<TradeRow>> {
        TradeDb::trade_history(self, limit)
    }
}

/// The trading bot's configuration files and database file
pub trait FileStore: Send + Sync {
    fn read(&self, file: BotFile) -> bm_store::Result<String>;

    /// Replace the whole file, returning the backup written first (if there was a file)
    fn replace(&self, file: BotFile, contents: &str) -> bm_store::Result<Option<PathBuf>>;

    fn database_path(&self) -> PathBuf;

    fn database_exists(&self) -> bool;

    fn delete_database(&self) -> bm_store::Result<PathBuf>;
}

impl FileStore for BotFiles {
    fn read(&self, file: BotFile) -> bm_store::Result<String> {
        BotFiles::read(self, file)
    }

    fn replace(&self, file: BotFile, contents: &str) -> bm_store::Result<Option<PathBuf>> {
        BotFiles::replace(self, file, contents)
    }

    fn database_path(&self) -> PathBuf {
        BotFiles::database_path(self).to_path_buf()
    }

    fn database_exists(&self) -> bool {
        BotFiles::database_exists(self)
    }

    fn delete_database(&self) -> bm_store::Result<PathBuf> {
        BotFiles::delete_database(self)
    }
}

/// Controls the external trading bot process. Best effort: callers re-check after a settle delay.
pub trait ProcessController: Send + Sync {
    fn is_running(&self) -> bool;

    fn start(&self) -> anyhow::Result<()>;

    fn stop(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    /// This console
    Manager,
    /// The external trading bot
    TradeBot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available { commits: u32 },
}

/// Checks for and applies updates of the console or the trading bot
pub trait Updater: Send + Sync {
    fn check(&self, target: UpdateTarget) -> anyhow::Result<UpdateStatus>;

    fn apply(&self, target: UpdateTarget) -> anyhow::Result<()>;
}

/// User-facing text lookup
pub trait Strings: Send + Sync {
    /// Text for `key` with `{name}` placeholders replaced from `params`
    fn lookup(&self, key: &str, params: &[(&str, String)]) -> String;
}

/// Tunables of the dialogue handlers
#[derive(Debug, Clone)]
pub struct Settings {
    /// Wait after start/stop before re-checking the process
    pub settle_delay: Duration,
    /// Rows shown by progress and trade history
    pub history_limit: usize,
    /// Exchange fee per trade, as a fraction
    pub trading_fee: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self { settle_delay: Duration::from_secs(5), history_limit: 10, trading_fee: 0.001 }
    }
}

/// Handles to every collaborator, cheap to clone into scheduled tasks
#[derive(Clone)]
pub struct Services {
    pub data: Arc<dyn StatusProvider>,
    pub files: Arc<dyn FileStore>,
    pub process: Arc<dyn ProcessController>,
    pub updater: Arc<dyn Updater>,
    pub strings: Arc<dyn Strings>,
    pub sender: Arc<dyn ChatSender>,
    pub scheduler: SchedulerHandle,
    pub settings: Settings,
}

impl Services {
    /// SQLite data provider and file store over one trading bot file layout
    pub fn store_backed(files: BotFiles) -> (Arc<dyn StatusProvider>, Arc<dyn FileStore>) {
        let data: Arc<dyn StatusProvider> = Arc::new(TradeDb::new(files.database_path()));
        (data, Arc::new(files))
    }

    /// Display name of a bot file for messages
    pub fn file_name(&self, file: BotFile) -> String {
        let key = match file {
            BotFile::UserConfig => "file.user_config",
            BotFile::CoinList => "file.coin_list",
        };
        self.strings.lookup(key, &[])
    }

    /// Display name of an update target for messages
    pub fn target_name(&self, target: UpdateTarget) -> String {
        let key = match target {
            UpdateTarget::Manager => "target.manager",
            UpdateTarget::TradeBot => "target.trade_bot",
        };
        self.strings.lookup(key, &[])
    }

    /// Pack fragments into messages and send them, outside of any dialogue step
    pub fn send_fragments(&self, identity: Identity, fragments: &[String], keyboard: Keyboard) -> anyhow::Result<()> {
        let reply = Reply::from_fragments(fragments, keyboard, None)?;
        self.sender.send_reply(identity, reply);
        Ok(())
    }
}

/// Path rendered for messages
pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}
