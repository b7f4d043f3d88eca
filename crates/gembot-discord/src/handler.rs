use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info};

use gembot_agent::{IncomingMessage, ResponsePipeline};

use crate::surface::DiscordSurface;

/// Serenity event handler wired to the response pipeline.
pub struct DiscordHandler {
    pub pipeline: Arc<ResponsePipeline>,
    pub bot_id: OnceLock<UserId>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_id.set(ready.user.id).ok();
        info!(name = %ready.user.name, id = %ready.user.id, "logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = match self.bot_id.get() {
            Some(id) => *id,
            None => ctx.cache.current_user().id,
        };

        let incoming = to_incoming(&msg, bot_id);
        debug!(
            channel_id = incoming.channel_id,
            author = %incoming.author_name,
            direct = incoming.is_direct,
            mentioned = incoming.mentions_self,
            "message received"
        );

        let surface = DiscordSurface::new(Arc::clone(&ctx.http), msg.channel_id, msg.id);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            pipeline.handle_incoming_message(&incoming, &surface).await;
        });
    }
}

/// Map a serenity message onto the platform-neutral pipeline input.
fn to_incoming(msg: &Message, bot_id: UserId) -> IncomingMessage {
    IncomingMessage {
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        author_mention: mention_token(msg.author.id.get()),
        author_is_self: msg.author.id == bot_id,
        text: msg.content.clone(),
        is_direct: msg.guild_id.is_none(),
        // Direct user mentions only. `@everyone`, `@here` and role pings do
        // not count, unlike discord.py's `mentioned_in`.
        mentions_self: msg.mentions_user_id(bot_id),
        self_mention: mention_token(bot_id.get()),
    }
}

/// Discord's user mention syntax, e.g. `<@123456789>`.
fn mention_token(user_id: u64) -> String {
    format!("<@{user_id}>")
}
