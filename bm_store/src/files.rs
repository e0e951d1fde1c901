use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::errors::Result;
use crate::errors::StoreError;

pub const USER_CONFIG_FILE: &str = "user.cfg";
pub const COIN_LIST_FILE: &str = "supported_coin_list";
pub const DATABASE_FILE: &str = "data/crypto_trading.db";

const BACKUP_SUFFIX: &str = "backup";

/// Plain-text files of the trading bot that can be edited from chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotFile {
    UserConfig,
    CoinList,
}

/// Locations of the trading bot's files
#[derive(Debug, Clone)]
pub struct BotFiles {
    user_config: PathBuf,
    coin_list: PathBuf,
    database: PathBuf,
}

impl BotFiles {
    /// Default file layout under the trading bot's directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_names(root, USER_CONFIG_FILE, COIN_LIST_FILE, DATABASE_FILE)
    }

    pub fn with_names(root: impl AsRef<Path>, user_config: &str, coin_list: &str, database: &str) -> Self {
        let root = root.as_ref();
        Self { user_config: root.join(user_config), coin_list: root.join(coin_list), database: root.join(database) }
    }

    pub fn path(&self, file: BotFile) -> &Path {
        match file {
            BotFile::UserConfig => &self.user_config,
            BotFile::CoinList => &self.coin_list,
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database
    }

    pub fn database_exists(&self) -> bool {
        self.database.is_file()
    }

    pub fn read(&self, file: BotFile) -> Result<String> {
        let path = self.path(file);
        fs::read_to_string(path).map_err(|err| StoreError::io(path, err))
    }

    /// Replace the whole file, first copying the current contents to `<file>.backup`.
    ///
    /// Returns the backup path, or `None` when there was no previous file to back up.
    pub fn replace(&self, file: BotFile, contents: &str) -> Result<Option<PathBuf>> {
        let path = self.path(file);
        let backup = if path.is_file() {
            let backup = backup_path(path);
            fs::copy(path, &backup).map_err(|err| StoreError::io(&backup, err))?;
            Some(backup)
        } else {
            None
        };

        let mut body = contents.to_string();
        if !body.ends_with('\n') {
            body.push('\n');
        }

        // Write beside the target and rename so the bot never reads a half-written file
        let staging = path.with_extension("tmp");
        fs::write(&staging, body).map_err(|err| StoreError::io(&staging, err))?;
        fs::rename(&staging, path).map_err(|err| StoreError::io(path, err))?;

        tracing::info!(file = %path.display(), "Replaced bot file");
        Ok(backup)
    }

    /// Move the database aside to `<database>.backup`, returning the backup path
    pub fn delete_database(&self) -> Result<PathBuf> {
        if !self.database_exists() {
            return Err(StoreError::Missing(self.database.clone()));
        }
        let backup = backup_path(&self.database);
        fs::rename(&self.database, &backup).map_err(|err| StoreError::io(&self.database, err))?;
        tracing::warn!(database = %self.database.display(), backup = %backup.display(), "Database removed");
        Ok(backup)
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}
