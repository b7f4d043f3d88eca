use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::gateway::GatewayError;
use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use gembot_agent::ResponsePipeline;
use gembot_core::config::DiscordConfig;

use crate::error::DiscordError;
use crate::handler::DiscordHandler;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the event loop until the process exits.
/// Reconnects whenever the gateway drops; only credential and intent
/// rejections end the loop.
pub struct DiscordAdapter {
    pipeline: Arc<ResponsePipeline>,
    config: DiscordConfig,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, pipeline: Arc<ResponsePipeline>) -> Self {
        Self {
            pipeline,
            config: config.clone(),
        }
    }

    /// Connect to Discord and keep reconnecting whenever the gateway drops.
    ///
    /// Returns only on an unrecoverable error.
    pub async fn run(self) -> Result<(), DiscordError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        loop {
            let mut client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: client build failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };

            info!("Discord: gateway connecting");

            match client.start().await {
                Err(serenity::Error::Gateway(GatewayError::InvalidAuthentication)) => {
                    return Err(DiscordError::InvalidToken);
                }
                Err(serenity::Error::Gateway(GatewayError::DisallowedGatewayIntents))
                | Err(serenity::Error::Gateway(GatewayError::InvalidGatewayIntents)) => {
                    return Err(DiscordError::DisallowedIntents);
                }
                Err(e) => warn!("Discord: gateway error ({e}), reconnecting in 5s"),
                Ok(()) => info!("Discord: gateway stopped cleanly, reconnecting in 5s"),
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Build a fresh serenity `Client` with our event handler.
    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = DiscordHandler {
            pipeline: Arc::clone(&self.pipeline),
            bot_id: OnceLock::new(),
        };

        Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
