use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GembotError, Result};

/// Number of history entries (user messages and bot replies) kept per channel.
pub const MAX_HISTORY_LENGTH: usize = 4;
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the Discord bot token.
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level config (gembot.toml + GEMBOT_* env overrides + raw secret env vars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GembotConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Falls back to `DISCORD_BOT_TOKEN` when empty.
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Falls back to `GEMINI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_HISTORY_LENGTH,
        }
    }
}

/// Prompt template overrides. Inline text wins over a file path; with neither,
/// the built-in template is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    pub system: Option<String>,
    pub user: Option<String>,
    pub system_path: Option<String>,
    pub user_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on a single generation call. Unset means wait indefinitely.
    pub generation_timeout_secs: Option<u64>,
}

impl PipelineConfig {
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_secs.map(Duration::from_secs)
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}
fn default_max_length() -> usize {
    MAX_HISTORY_LENGTH
}

impl GembotConfig {
    /// Load config from a TOML file with GEMBOT_* env var overrides.
    ///
    /// The file is optional: with no file at all, the two secrets from the
    /// environment are enough to start. Nested keys use `__` in env names,
    /// e.g. `GEMBOT_HISTORY__MAX_LENGTH=8`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading config");

        let figment = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("GEMBOT_").split("__"));

        Self::from_figment(figment, |name| std::env::var(name).ok())
    }

    /// Extract from an already-assembled figment, resolve secrets through
    /// `lookup` and validate. Split out of [`load`](Self::load) so tests do not
    /// touch the process environment.
    pub fn from_figment<F>(figment: Figment, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: GembotConfig = figment
            .extract()
            .map_err(|e| GembotError::Config(e.to_string()))?;

        config.discord.bot_token =
            resolve_secret(&config.discord.bot_token, DISCORD_TOKEN_ENV, &lookup)?;
        config.gemini.api_key = resolve_secret(&config.gemini.api_key, GEMINI_KEY_ENV, &lookup)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.history.max_length == 0 {
            return Err(GembotError::Config(
                "history.max_length must be at least 1".to_string(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(GembotError::Config("gemini.model is empty".to_string()));
        }
        Ok(())
    }
}

/// The raw env var wins over the file value; an empty result is fatal.
fn resolve_secret<F>(from_file: &str, env_name: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(env_name)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| from_file.to_string());

    if value.trim().is_empty() {
        return Err(GembotError::Config(format!("{env_name} not found")));
    }
    Ok(value)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.gembot/gembot.toml", home)
}
