use async_trait::async_trait;

/// Request to an LLM provider: one flattened prompt, one completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// System instructions, history and the user's message, already assembled.
    pub prompt: String,
}

/// Response from an LLM provider (non-streaming).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a non-streaming request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("generation timed out after {ms}ms")]
    Timeout { ms: u64 },
}
