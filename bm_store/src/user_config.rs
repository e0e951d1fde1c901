use config::Config;
use config::File;
use config::FileFormat;
use serde::Deserialize;

use crate::errors::Result;
use crate::errors::StoreError;

/// Section of `user.cfg` holding the trading bot's settings
pub const USER_CONFIG_SECTION: &str = "binance_user_config";

/// Settings of the trading bot that the console reads from `user.cfg`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UserConfig {
    pub bridge: Option<String>,
    pub scout_multiplier: Option<f64>,
    pub scout_margin: Option<f64>,
    pub use_margin: Option<String>,
    pub strategy: Option<String>,
    pub tld: Option<String>,
}

impl UserConfig {
    /// Parse the INI contents of `user.cfg`
    pub fn parse(contents: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Ini))
            .build()
            .map_err(|err| StoreError::Malformed { what: "user.cfg".to_string(), reason: err.to_string() })?;

        config
            .get::<UserConfig>(USER_CONFIG_SECTION)
            .map_err(|err| StoreError::Malformed { what: "user.cfg".to_string(), reason: err.to_string() })
    }

    /// Whether margin mode is switched on
    pub fn margin_enabled(&self) -> bool {
        self.use_margin.as_deref().map(str::trim).is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "yes" | "true" | "1"))
    }

    /// Bridge coin, `USDT` when unset
    pub fn bridge(&self) -> &str {
        self.bridge.as_deref().unwrap_or("USDT")
    }
}
