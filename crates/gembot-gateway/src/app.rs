use std::sync::Arc;

use tracing::info;

use gembot_agent::{GeminiProvider, HistoryStore, LlmProvider, PromptTemplates, ResponsePipeline};
use gembot_core::config::GembotConfig;

/// Build the response pipeline from config: Gemini provider, history store
/// and prompt templates. Fails on an invalid prompt template.
pub fn build_pipeline(config: &GembotConfig) -> gembot_core::Result<Arc<ResponsePipeline>> {
    let templates = PromptTemplates::from_config(&config.prompt)?;

    info!(
        model = %config.gemini.model,
        base_url = %config.gemini.base_url,
        "LLM provider: Gemini"
    );
    let provider: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::from_config(&config.gemini));

    let history = HistoryStore::new(config.history.max_length);
    info!(max_length = history.max_length(), "history store ready");

    let timeout = config.pipeline.generation_timeout();
    if let Some(t) = timeout {
        info!(timeout_secs = t.as_secs(), "generation timeout enabled");
    }

    let pipeline = ResponsePipeline::new(provider, history, templates, config.gemini.model.clone())
        .with_generation_timeout(timeout);
    Ok(Arc::new(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GembotConfig {
        let mut config = GembotConfig::default();
        config.discord.bot_token = "token".to_string();
        config.gemini.api_key = "key".to_string();
        config
    }

    #[test]
    fn pipeline_uses_configured_model_and_bound() {
        let mut config = config();
        config.gemini.model = "gemini-1.5-flash".to_string();
        config.history.max_length = 6;

        let pipeline = build_pipeline(&config).expect("should build");
        assert_eq!(pipeline.model(), "gemini-1.5-flash");
        assert_eq!(pipeline.history().max_length(), 6);
    }

    #[test]
    fn invalid_template_fails_startup() {
        let mut config = config();
        config.prompt.user = Some("{unknown}".to_string());

        let err = build_pipeline(&config).err().expect("should fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
