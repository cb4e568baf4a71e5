//! OpenAI adapter (chat-completions style APIs)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::ProviderAdapter;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// OpenAI adapter. Stateless with respect to credentials — the secret and
/// optional endpoint override arrive with each call.
pub struct OpenAiAdapter {
    client: Client,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string(), DEFAULT_MAX_TOKENS, Duration::from_secs(30))
    }
}

impl OpenAiAdapter {
    pub fn new(base_url: String, max_tokens: u32, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            max_tokens,
        }
    }

    /// The endpoint override on a credential, when present, replaces the
    /// adapter's default base URL unmodified.
    fn base<'a>(&'a self, endpoint: Option<&'a str>) -> &'a str {
        endpoint.unwrap_or(&self.base_url)
    }

    fn models_url(&self, endpoint: Option<&str>) -> String {
        format!("{}/v1/models", self.base(endpoint))
    }

    fn completions_url(&self, endpoint: Option<&str>) -> String {
        format!("{}/v1/chat/completions", self.base(endpoint))
    }

    /// Pull model identifiers out of a models-list response, preserving
    /// the provider's order.
    fn from_models_response(resp: ModelsResponse) -> Vec<String> {
        resp.data.into_iter().map(|m| m.id).collect()
    }

    /// Pull the generated text out of a chat-completions response.
    fn from_chat_response(resp: ChatCompletionsResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::GenerationFailed {
                reason: "response had no choices".to_string(),
            })?;

        match choice.message.content {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(Error::GenerationFailed {
                reason: "response choice had no content".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn validate(&self, secret: &str, endpoint: Option<&str>) -> bool {
        let url = self.models_url(endpoint);
        match self.client.get(&url).bearer_auth(secret).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("OpenAI credential probe succeeded");
                true
            }
            Ok(resp) => {
                warn!("OpenAI credential probe rejected with status {}", resp.status());
                false
            }
            Err(e) => {
                warn!("OpenAI credential probe failed to reach provider: {e}");
                false
            }
        }
    }

    async fn list_models(&self, secret: &str, endpoint: Option<&str>) -> Result<Vec<String>> {
        let url = self.models_url(endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| Error::ProviderUnavailable {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProviderUnavailable {
                provider: "openai".to_string(),
                reason: format!("model listing failed with status {status}"),
            });
        }

        let parsed: ModelsResponse =
            response.json().await.map_err(|e| Error::ProviderUnavailable {
                provider: "openai".to_string(),
                reason: format!("failed to parse model listing: {e}"),
            })?;

        let models = Self::from_models_response(parsed);
        debug!("OpenAI listed {} models", models.len());
        Ok(models)
    }

    async fn generate(
        &self,
        secret: &str,
        model: &str,
        prompt: &str,
        endpoint: Option<&str>,
    ) -> Result<String> {
        let url = self.completions_url(endpoint);
        let body = ChatCompletionsRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("OpenAI generate: model={model}, prompt_len={}", prompt.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GenerationFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::GenerationFailed {
                reason: format!("status {status}: {error_text}"),
            });
        }

        let parsed: ChatCompletionsResponse =
            response.json().await.map_err(|e| Error::GenerationFailed {
                reason: format!("failed to parse response: {e}"),
            })?;

        Self::from_chat_response(parsed)
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_models_response_preserves_order() {
        let resp = ModelsResponse {
            data: vec![
                ModelEntry { id: "gpt-4o".to_string() },
                ModelEntry { id: "gpt-4o-mini".to_string() },
                ModelEntry { id: "o3".to_string() },
            ],
        };
        assert_eq!(
            OpenAiAdapter::from_models_response(resp),
            vec!["gpt-4o", "gpt-4o-mini", "o3"]
        );
    }

    #[test]
    fn test_from_chat_response_text() {
        let resp = ChatCompletionsResponse {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some("  Hello there.  \n".to_string()),
                },
            }],
        };
        assert_eq!(OpenAiAdapter::from_chat_response(resp).unwrap(), "Hello there.");
    }

    #[test]
    fn test_from_chat_response_no_choices() {
        let resp = ChatCompletionsResponse { choices: vec![] };
        let err = OpenAiAdapter::from_chat_response(resp).unwrap_err();
        assert!(matches!(err, Error::GenerationFailed { .. }));
    }

    #[test]
    fn test_from_chat_response_empty_content() {
        let resp = ChatCompletionsResponse {
            choices: vec![Choice {
                message: ChoiceMessage { content: None },
            }],
        };
        assert!(OpenAiAdapter::from_chat_response(resp).is_err());
    }

    #[test]
    fn test_endpoint_override() {
        let adapter = OpenAiAdapter::default();
        assert_eq!(
            adapter.models_url(Some("https://proxy.internal")),
            "https://proxy.internal/v1/models"
        );
        assert_eq!(
            adapter.completions_url(None),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_serializes_user_prompt() {
        let body = ChatCompletionsRequest {
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "status?".to_string(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "status?");
    }
}
