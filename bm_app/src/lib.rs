//! # bm_app
//!
//! Shared process utilities for the bot manager binary

pub mod cli;
pub mod config_loader;
pub mod shutdown_handler;
pub mod tracing_setup;

pub use config_loader::ManagerConfig;
