use crate::services::Strings;

/// Every button the console shows. Labels come from the string table under [`Button::key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    CurrentValue,
    Progress,
    CurrentRatios,
    NextCoin,
    TradeHistory,
    CheckStatus,
    StartBot,
    StopBot,
    Configurations,
    Maintenance,
    EditUserConfig,
    EditCoinList,
    ExportDatabase,
    DeleteDatabase,
    UpdateManager,
    UpdateTradeBot,
    Back,
    Confirm,
    Cancel,
}

impl Button {
    /// Buttons accepted while a session is at the menu, whichever menu page is displayed
    pub const MENU: [Button; 17] = [
        Button::CurrentValue,
        Button::Progress,
        Button::CurrentRatios,
        Button::NextCoin,
        Button::TradeHistory,
        Button::CheckStatus,
        Button::StartBot,
        Button::StopBot,
        Button::Configurations,
        Button::Maintenance,
        Button::EditUserConfig,
        Button::EditCoinList,
        Button::ExportDatabase,
        Button::DeleteDatabase,
        Button::UpdateManager,
        Button::UpdateTradeBot,
        Button::Back,
    ];

    /// Buttons accepted by confirmation prompts
    pub const CONFIRM: [Button; 2] = [Button::Confirm, Button::Cancel];

    pub fn key(self) -> &'static str {
        match self {
            Button::CurrentValue => "button.current_value",
            Button::Progress => "button.progress",
            Button::CurrentRatios => "button.current_ratios",
            Button::NextCoin => "button.next_coin",
            Button::TradeHistory => "button.trade_history",
            Button::CheckStatus => "button.check_status",
            Button::StartBot => "button.start_bot",
            Button::StopBot => "button.stop_bot",
            Button::Configurations => "button.configurations",
            Button::Maintenance => "button.maintenance",
            Button::EditUserConfig => "button.edit_user_config",
            Button::EditCoinList => "button.edit_coin_list",
            Button::ExportDatabase => "button.export_database",
            Button::DeleteDatabase => "button.delete_database",
            Button::UpdateManager => "button.update_manager",
            Button::UpdateTradeBot => "button.update_trade_bot",
            Button::Back => "button.back",
            Button::Confirm => "button.confirm",
            Button::Cancel => "button.cancel",
        }
    }

    pub fn label(self, strings: &dyn Strings) -> String {
        strings.lookup(self.key(), &[])
    }

    /// Match incoming text against the labels of `candidates`
    pub fn parse(text: &str, candidates: &[Button], strings: &dyn Strings) -> Option<Button> {
        let text = text.trim();
        candidates.iter().copied().find(|button| button.label(strings) == text)
    }
}
