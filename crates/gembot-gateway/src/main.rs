use tracing::{error, info};

use gembot_core::config::GembotConfig;
use gembot_core::GembotError;

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gembot=info,gembot_gateway=info,gembot_agent=info,gembot_discord=info".into()
            }),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("GEMBOT_GIT_SHA"),
        "gembot starting"
    );

    // load config: GEMBOT_CONFIG env > ~/.gembot/gembot.toml, secrets from env
    let config_path = std::env::var("GEMBOT_CONFIG").ok();
    let config = GembotConfig::load(config_path.as_deref()).inspect_err(|e| {
        error!(code = e.code(), error = %e, "startup aborted");
    })?;

    let pipeline = app::build_pipeline(&config).inspect_err(|e| {
        error!(code = e.code(), error = %e, "startup aborted");
    })?;

    let adapter = gembot_discord::DiscordAdapter::new(&config.discord, pipeline);
    info!("Discord bot starting");

    adapter.run().await.map_err(|e| {
        let err = GembotError::Channel {
            channel: "discord".to_string(),
            reason: e.to_string(),
        };
        error!(code = err.code(), error = %err, "Discord adapter stopped");
        err
    })?;

    Ok(())
}
