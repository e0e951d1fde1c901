use teloxide::utils::command::BotCommands;

/// Commands advertised in the Telegram client's menu.
///
/// Only registered for discoverability; the text of every message, commands included, is routed to
/// the session as is.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Bot manager commands:")]
pub enum Command {
    #[command(description = "Show the main menu")]
    Start,

    #[command(description = "Cancel the file edit in progress")]
    Stop,
}
