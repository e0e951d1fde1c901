//! # bm_render
//!
//! Text layout for chat replies: packs fragments into size-bounded messages and lays out
//! fixed-width tables. Everything here is pure; nothing performs I/O.

pub mod cell;
pub mod error;
pub mod table;
pub mod truncate;

pub use cell::Cell;
pub use cell::escape_html;
pub use cell::format_number;
pub use cell::format_text;
pub use error::RenderError;
pub use error::Result;
pub use table::Align;
pub use table::Layout;
pub use table::tabularize;
pub use truncate::truncate_to_messages;

/// Telegram's hard limit on the length of a single text message
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Number of data rows placed in one rendered table before a new table is started
pub const ROWS_PER_TABLE: usize = 20;

/// Opening pad for monospace blocks in HTML parse mode
pub const PRE_HEAD: &str = "<pre>";

/// Closing pad for monospace blocks in HTML parse mode
pub const PRE_TAIL: &str = "</pre>";
