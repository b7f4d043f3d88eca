//! Per-message response pipeline.
//!
//! record → decide → assemble prompt → generate on a spawned task → reply →
//! record the reply. Failures end in a fixed apology and never escape.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::history::{HistoryEntry, HistoryStore};
use crate::prompt::{PromptContext, PromptTemplates};
use crate::provider::{ChatRequest, LlmProvider, ProviderError};

use super::message::IncomingMessage;
use super::surface::ChatSurface;

/// Sent instead of a reply when generation (or posting the reply) fails.
pub const APOLOGY: &str =
    "Sorry, I encountered an error while trying to respond. Please try again later.";

/// What the pipeline did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Authored by the bot itself; nothing recorded.
    IgnoredSelf,
    /// Recorded as context; no reply was needed.
    Recorded,
    /// Model reply posted and recorded.
    Replied,
    /// Apology posted; the reply was not recorded.
    Apologized,
}

pub struct ResponsePipeline {
    provider: Arc<dyn LlmProvider>,
    history: HistoryStore,
    templates: PromptTemplates,
    model: String,
    generation_timeout: Option<Duration>,
}

impl ResponsePipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        history: HistoryStore,
        templates: PromptTemplates,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            history,
            templates,
            model: model.into(),
            generation_timeout: None,
        }
    }

    /// Bound each generation call. `None` (the default) waits indefinitely.
    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn handle_incoming_message<S>(&self, msg: &IncomingMessage, surface: &S) -> Outcome
    where
        S: ChatSurface + ?Sized,
    {
        if msg.author_is_self {
            return Outcome::IgnoredSelf;
        }

        let channel_id = msg.channel_id;
        self.history
            .append(channel_id, HistoryEntry::user(msg.text.as_str()));

        if !msg.requires_reply() {
            return Outcome::Recorded;
        }

        let user_prompt = msg.prompt_text();
        info!(
            channel_id,
            author_id = msg.author_id,
            author = %msg.author_name,
            direct = msg.is_direct,
            content = %user_prompt,
            "received mention/DM"
        );

        let ctx = PromptContext {
            user_prompt,
            sender_name: msg.author_name.clone(),
            sender_mention: msg.author_mention.clone(),
            history: self.history.snapshot_excluding_last(channel_id),
        };
        let prompt = self.templates.assemble(&ctx);
        debug!(channel_id, prompt = %prompt, "assembled prompt");

        surface.start_typing();
        let outcome = match self.generate(prompt).await {
            Ok(text) => match surface.reply(&text).await {
                Ok(()) => {
                    self.history.append(channel_id, HistoryEntry::bot(text));
                    Outcome::Replied
                }
                Err(e) => {
                    warn!(channel_id, error = %e, "sending reply failed");
                    self.apologize(msg, surface).await
                }
            },
            Err(e) => {
                warn!(
                    channel_id,
                    provider = self.provider.name(),
                    model = %self.model,
                    error = %e,
                    "generation failed"
                );
                self.apologize(msg, surface).await
            }
        };
        surface.stop_typing();

        outcome
    }

    /// Run the provider call on its own task and wait for it.
    async fn generate(&self, prompt: String) -> Result<String, ProviderError> {
        let provider = Arc::clone(&self.provider);
        let req = ChatRequest {
            model: self.model.clone(),
            prompt,
        };

        let task = tokio::spawn(async move { provider.send(&req).await });
        let abort = task.abort_handle();

        let joined = match self.generation_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(ProviderError::Timeout {
                        ms: limit.as_millis() as u64,
                    });
                }
            },
            None => task.await,
        };

        let resp = joined
            .map_err(|e| ProviderError::Unavailable(format!("generation task failed: {e}")))??;

        debug!(
            model = %resp.model,
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            stop_reason = %resp.stop_reason,
            "generation complete"
        );
        Ok(resp.content)
    }

    async fn apologize<S>(&self, msg: &IncomingMessage, surface: &S) -> Outcome
    where
        S: ChatSurface + ?Sized,
    {
        if let Err(e) = surface.reply(APOLOGY).await {
            warn!(channel_id = msg.channel_id, error = %e, "sending apology failed");
        }
        Outcome::Apologized
    }
}
