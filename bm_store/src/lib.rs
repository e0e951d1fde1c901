//! # bm_store
//!
//! Read access to the trading bot's SQLite database and replace-with-backup access to its
//! configuration files. The trading bot owns both; everything here is best effort and reports a
//! missing file as [`StoreError::Missing`].

pub mod errors;
pub mod files;
pub mod trade_db;
pub mod user_config;

pub use errors::Result;
pub use errors::StoreError;
pub use files::BotFile;
pub use files::BotFiles;
pub use trade_db::BalanceRow;
pub use trade_db::ProgressRow;
pub use trade_db::RatioRow;
pub use trade_db::TradeDb;
pub use trade_db::TradeRow;
pub use user_config::UserConfig;
