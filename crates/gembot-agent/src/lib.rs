pub mod gemini;
pub mod history;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use gemini::GeminiProvider;
pub use history::{ChannelKey, HistoryEntry, HistoryStore, Speaker};
pub use pipeline::{ChatSurface, IncomingMessage, Outcome, ResponsePipeline};
pub use prompt::{PromptContext, PromptTemplates};
pub use provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
