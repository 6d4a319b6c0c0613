//! Completion providers.
//!
//! Query expansion, reranking, and answer synthesis all go through one chat
//! completion seam. Call sites must tolerate non-JSON and truncated output,
//! so the only contract here is "prompt in, text out".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, Result};

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: String,

    /// User prompt.
    pub user: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a new completion request.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            model: None,
            temperature: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for chat completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Name of this provider.
    fn name(&self) -> &str;

    /// Default model for this provider.
    fn default_model(&self) -> &str;

    /// Run one completion and return the raw assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Whether the provider can be called (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// OpenAI-style chat completions API client.
pub struct OpenAiCompletions {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,
}

impl OpenAiCompletions {
    /// Create a provider reading `OPENAI_API_KEY` from the environment.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

impl Default for OpenAiCompletions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured)?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Running completion with model: {model}");

        let mut body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ]
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiRequest(format!(
                "API error: {error_text}"
            )));
        }

        let result: ChatApiResponse = response.json().await?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no completion in response".to_string()))?;

        Ok(content)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Chat completions API response format.
#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    choices: Vec<ChatApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatApiChoice {
    message: ChatApiMessage,
}

#[derive(Debug, Deserialize)]
struct ChatApiMessage {
    content: Option<String>,
}

/// Extract the outermost JSON array from model output.
///
/// Models wrap arrays in prose or code fences often enough that strict
/// parsing alone loses good answers. Taking the first `[` through the last
/// `]` matches the tolerance the pipeline promises its call sites.
pub fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn extracts_array_from_prose() {
        let raw = "Sure! Here you go:\n```json\n[\"a\", \"b\"]\n```";
        assert_eq!(extract_json_array(raw), Some("[\"a\", \"b\"]"));
    }

    #[test]
    fn extracts_nested_array_span() {
        let raw = "[{\"index\": 0, \"score\": 0.9}] trailing";
        assert_eq!(
            extract_json_array(raw),
            Some("[{\"index\": 0, \"score\": 0.9}]")
        );
    }

    #[test]
    fn no_array_returns_none() {
        assert_eq!(extract_json_array("no json here"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "[\"diesel supply\"]"}}
                ]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompletions::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let out = provider
            .complete(CompletionRequest::new("sys", "user").with_temperature(0.0))
            .await
            .unwrap();
        assert_eq!(out, "[\"diesel supply\"]");
    }

    #[tokio::test]
    async fn missing_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompletions::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let err = provider
            .complete(CompletionRequest::new("sys", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
