//! Google Gemini provider (Generative Language API, API-key auth).
//!
//! One `generateContent` call per request. The whole prompt, system
//! instructions included, goes in a single user-role part and the reply is
//! requested as plain text.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use gembot_core::config::GeminiConfig;

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// Fallback when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Build the request body for the generateContent endpoint.
    fn build_body(req: &ChatRequest) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": req.prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "text/plain",
            }
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint(&req.model);
        let body = Self::build_body(req);

        debug!(model = %req.model, prompt_chars = req.prompt.len(), "sending request to Gemini");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_ms = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(ProviderError::RateLimited { retry_after_ms });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        into_chat_response(api_resp, &req.model)
    }
}

/// Flatten the first candidate's text parts. A reply without text (blocked
/// prompt, safety stop) is an error: there is nothing to post.
fn into_chat_response(api_resp: GeminiResponse, model: &str) -> Result<ChatResponse, ProviderError> {
    let usage = api_resp.usage_metadata.unwrap_or_default();
    let block_reason = api_resp.prompt_feedback.and_then(|f| f.block_reason);

    let candidate = api_resp.candidates.into_iter().next();
    let content = candidate
        .as_ref()
        .map(|c| {
            c.content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let stop_reason = candidate.and_then(|c| c.finish_reason).unwrap_or_default();

    if content.trim().is_empty() {
        let reason = block_reason
            .map(|r| format!("prompt blocked ({r})"))
            .or_else(|| (!stop_reason.is_empty()).then(|| format!("finish reason {stop_reason}")))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ProviderError::EmptyResponse(reason));
    }

    Ok(ChatResponse {
        content,
        model: model.to_string(),
        tokens_in: usage.prompt_token_count,
        tokens_out: usage.candidates_token_count,
        stop_reason,
    })
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ChatResponse, ProviderError> {
        let resp: GeminiResponse = serde_json::from_str(json).expect("valid JSON");
        into_chat_response(resp, "gemini-2.0-flash")
    }

    #[test]
    fn endpoint_includes_model_and_ignores_trailing_slash() {
        let p = GeminiProvider::new("key", "https://example.test/");
        assert_eq!(
            p.endpoint("gemini-2.0-flash"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn body_is_single_user_part_with_plain_text_mime() {
        let req = ChatRequest {
            model: "gemini-2.0-flash".into(),
            prompt: "SYSTEM\n\nhello".into(),
        };
        let body = GeminiProvider::build_body(&req);

        assert_eq!(body["contents"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "SYSTEM\n\nhello");
        assert_eq!(body["generationConfig"]["responseMimeType"], "text/plain");
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let resp = parse(
            r#"{
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                     "finishReason": "STOP"},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
            }"#,
        )
        .expect("should parse");

        assert_eq!(resp.content, "Hello there");
        assert_eq!(resp.stop_reason, "STOP");
        assert_eq!(resp.tokens_in, 12);
        assert_eq!(resp.tokens_out, 3);
        assert_eq!(resp.model, "gemini-2.0-flash");
    }

    #[test]
    fn blocked_prompt_is_empty_response_error() {
        let err = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        match err {
            ProviderError::EmptyResponse(reason) => assert!(reason.contains("SAFETY")),
            other => panic!("expected EmptyResponse, got {other:?}"),
        }
    }

    #[test]
    fn candidate_without_content_reports_finish_reason() {
        let err = parse(r#"{"candidates": [{"finishReason": "RECITATION"}]}"#).unwrap_err();
        assert!(err.to_string().contains("RECITATION"));
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let resp = parse(r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#)
            .expect("should parse");
        assert_eq!(resp.tokens_in, 0);
        assert_eq!(resp.tokens_out, 0);
        assert_eq!(resp.stop_reason, "");
    }
}
