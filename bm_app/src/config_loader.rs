use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use bm_scheduler::delay_from_secs;
use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Prefix of environment variables overriding the file, e.g. `BM_BOT_PATH`
pub const ENV_PREFIX: &str = "BM";

/// Settings of the bot manager
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory the trading bot is installed in
    pub bot_path: PathBuf,
    /// Git checkout of the manager itself, for self-updates
    pub manager_path: PathBuf,
    pub python_path: String,
    /// Matched against full command lines to find the trading bot process
    pub process_pattern: String,
    pub user_config_file: String,
    pub coin_list_file: String,
    pub database_file: String,
    /// Optional TOML file overriding the bundled strings
    pub language_file: Option<PathBuf>,
    pub scheduler_poll_ms: u64,
    pub status_poll_secs: f64,
    /// Periodic balance report; off when unset
    pub snapshot_interval_secs: Option<f64>,
    /// Periodic update check; off when unset
    pub update_check_secs: Option<f64>,
    pub settle_delay_secs: f64,
    pub history_limit: usize,
    pub trading_fee: f64,
    pub log_dir: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            bot_path: PathBuf::from("../binance-trade-bot"),
            manager_path: PathBuf::from("."),
            python_path: "python3".to_string(),
            process_pattern: "binance_trade_bot".to_string(),
            user_config_file: "user.cfg".to_string(),
            coin_list_file: "supported_coin_list".to_string(),
            database_file: "data/crypto_trading.db".to_string(),
            language_file: None,
            scheduler_poll_ms: 500,
            status_poll_secs: 30.0,
            snapshot_interval_secs: None,
            update_check_secs: Some(6.0 * 60.0 * 60.0),
            settle_delay_secs: 5.0,
            history_limit: 10,
            trading_fee: 0.001,
            log_dir: "logs".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn scheduler_poll(&self) -> Duration {
        Duration::from_millis(self.scheduler_poll_ms.max(1))
    }

    pub fn status_poll(&self) -> Duration {
        delay_from_secs(self.status_poll_secs).max(Duration::from_secs(1))
    }

    pub fn snapshot_interval(&self) -> Option<Duration> {
        self.snapshot_interval_secs.map(delay_from_secs).filter(|interval| !interval.is_zero())
    }

    pub fn update_check_interval(&self) -> Option<Duration> {
        self.update_check_secs.map(delay_from_secs).filter(|interval| !interval.is_zero())
    }

    pub fn settle_delay(&self) -> Duration {
        delay_from_secs(self.settle_delay_secs)
    }
}

/// Load the manager config from `path` (optional) with `BM_*` environment overrides on top
pub fn load_manager_config<P: AsRef<Path>>(path: P) -> Result<ManagerConfig, ConfigError> {
    build(path.as_ref(), Environment::with_prefix(ENV_PREFIX).try_parsing(true))
}

fn build(path: &Path, environment: Environment) -> Result<ManagerConfig, ConfigError> {
    let config = Config::builder().add_source(File::from(path).required(false)).add_source(environment).build()?;

    config.try_deserialize()
}
