use crate::history::ChannelKey;

/// Substituted when a mention carries no text of its own.
pub const FALLBACK_PROMPT: &str = "Hello!";

/// A chat message as the pipeline sees it, independent of the platform.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel_id: ChannelKey,
    pub author_id: u64,
    /// Display name used for `{sender_name}`.
    pub author_name: String,
    /// Platform mention token for the author, used for `{sender_mention}`.
    pub author_mention: String,
    pub author_is_self: bool,
    /// Raw message text, mentions included.
    pub text: String,
    /// Private one-to-one channel with the bot.
    pub is_direct: bool,
    pub mentions_self: bool,
    /// The bot's own mention token (e.g. `<@1234>`), stripped from prompts.
    pub self_mention: String,
}

impl IncomingMessage {
    /// Mentions and direct messages get a reply; everything else is context only.
    pub fn requires_reply(&self) -> bool {
        self.mentions_self || self.is_direct
    }

    /// The text to answer: own mention removed, trimmed, never empty.
    pub fn prompt_text(&self) -> String {
        let stripped = if self.self_mention.is_empty() {
            self.text.clone()
        } else {
            self.text.replace(&self.self_mention, "")
        };
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            FALLBACK_PROMPT.to_string()
        } else {
            trimmed.to_string()
        }
    }
}
