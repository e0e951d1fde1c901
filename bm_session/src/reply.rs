use std::path::PathBuf;

use bm_render::MAX_MESSAGE_LENGTH;
use bm_render::truncate_to_messages;

use crate::button::Button;

/// Reply keyboard to show alongside a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the user currently sees
    Unchanged,
    Main,
    Configurations,
    Maintenance,
    Confirm,
    /// Edit prompts: only a cancel button, free text is the answer
    Cancel,
}

impl Keyboard {
    /// Button layout, row by row
    pub fn rows(self) -> Vec<Vec<Button>> {
        match self {
            Keyboard::Unchanged => Vec::new(),
            Keyboard::Main => vec![
                vec![Button::CurrentValue, Button::Progress],
                vec![Button::CurrentRatios, Button::NextCoin],
                vec![Button::CheckStatus, Button::TradeHistory],
                vec![Button::StartBot, Button::StopBot],
                vec![Button::Configurations, Button::Maintenance],
            ],
            Keyboard::Configurations => vec![
                vec![Button::EditUserConfig, Button::EditCoinList],
                vec![Button::ExportDatabase, Button::DeleteDatabase],
                vec![Button::Back],
            ],
            Keyboard::Maintenance => vec![vec![Button::UpdateManager, Button::UpdateTradeBot], vec![Button::Back]],
            Keyboard::Confirm => vec![vec![Button::Confirm, Button::Cancel]],
            Keyboard::Cancel => vec![vec![Button::Cancel]],
        }
    }
}

/// File sent as an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub caption: String,
}

/// Outbound answer to one event: bounded messages, an optional keyboard change and attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<String>,
    pub keyboard: Keyboard,
    pub document: Option<Document>,
}

impl Reply {
    /// Pack fragments into messages within the platform limit
    pub fn from_fragments(fragments: &[String], keyboard: Keyboard, document: Option<Document>) -> bm_render::Result<Self> {
        let messages = truncate_to_messages(fragments, MAX_MESSAGE_LENGTH, "", "")?;
        Ok(Self { messages, keyboard, document })
    }

    /// Single short message
    pub fn text(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self { messages: vec![text.into()], keyboard, document: None }
    }
}
