//! # bm_tg
//!
//! Telegram side of the bot manager: the update handler feeding the session thread, the outbound
//! sender task, and the shell-backed process controller and git updater.

pub mod auth;
pub mod bot_commands;
pub mod handlers;
pub mod keyboard;
pub mod outbound;
pub mod process;
pub mod rate_limiter;
pub mod updater;

pub use auth::AuthorizedUser;
pub use bot_commands::Command;
pub use outbound::Outbound;
pub use outbound::OutboundSender;
pub use outbound::run_sender;
pub use process::ShellProcessController;
pub use rate_limiter::RateLimiter;
pub use updater::GitUpdater;
