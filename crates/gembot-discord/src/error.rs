/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("no bot token configured")]
    NoToken,

    #[error("Discord rejected the bot token")]
    InvalidToken,

    #[error("Discord rejected the gateway intents (enable the Message Content intent for this bot)")]
    DisallowedIntents,
}
