//! # bm_session
//!
//! Per-user dialogue control for the trading bot console.
//!
//! Each chat identity owns one [`Session`] whose [`SessionState`] decides how the next piece of
//! input is read: a menu button, free text for a file edit, or a confirm/cancel answer. Handlers
//! run their side effect through the collaborator traits in [`services`], then hand the result to
//! [`views`] for rendering.
//!
//! The [`router`] loop owns all sessions on one thread; [`tasks`] registers the background work that
//! reports to the same user through the scheduler.

pub mod button;
pub mod machine;
pub mod ratio;
pub mod reply;
pub mod router;
pub mod services;
pub mod state;
pub mod strings;
pub mod tasks;
pub mod views;

pub use button::Button;
pub use machine::StateMachine;
pub use ratio::RatioLine;
pub use ratio::RatioPolicy;
pub use reply::Document;
pub use reply::Keyboard;
pub use reply::Reply;
pub use router::InboundEvent;
pub use router::run_router;
pub use services::ChatSender;
pub use services::FileStore;
pub use services::ProcessController;
pub use services::Services;
pub use services::Settings;
pub use services::StatusProvider;
pub use services::Strings;
pub use services::UpdateStatus;
pub use services::UpdateTarget;
pub use services::Updater;
pub use state::Identity;
pub use state::Pending;
pub use state::Session;
pub use state::SessionState;
pub use state::Sessions;
pub use strings::StringTable;
pub use tasks::ProcessWatch;
pub use tasks::TaskIntervals;
pub use tasks::register_tasks;

/// Command that opens a session and shows the main menu
pub const START_COMMAND: &str = "/start";

/// Free-text token that abandons an edit
pub const STOP_COMMAND: &str = "/stop";
