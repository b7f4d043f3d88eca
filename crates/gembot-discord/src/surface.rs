//! `ChatSurface` for one Discord message.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serenity::http::{Http, Typing};
use serenity::model::id::{ChannelId, MessageId};

use gembot_agent::pipeline::{ChatSurface, SurfaceError};

use crate::send;

/// Replies go to the originating channel, the first chunk referencing the
/// originating message.
pub struct DiscordSurface {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
    typing: Mutex<Option<Typing>>,
}

impl DiscordSurface {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            http,
            channel_id,
            message_id,
            typing: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChatSurface for DiscordSurface {
    fn start_typing(&self) {
        // Serenity re-sends the indicator every few seconds until stopped.
        let typing = self.channel_id.start_typing(&self.http);
        if let Ok(mut slot) = self.typing.lock() {
            if let Some(previous) = slot.replace(typing) {
                previous.stop();
            }
        }
    }

    fn stop_typing(&self) {
        let current = self.typing.lock().ok().and_then(|mut slot| slot.take());
        if let Some(typing) = current {
            typing.stop();
        }
    }

    async fn reply(&self, text: &str) -> Result<(), SurfaceError> {
        send::send_response(&self.http, self.channel_id, text, self.message_id)
            .await
            .map_err(|e| SurfaceError(e.to_string()))
    }
}
