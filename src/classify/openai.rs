//! Client for OpenAI-compatible chat-completion endpoints

use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use super::{ClassificationError, CompletionClient, Prompt};
use crate::config::OpenAiConfig;

/// Sampling temperature used for every classification request
pub const TEMPERATURE: f32 = 0.5;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Masks an API key for logging: first 7 chars + "***" + last 4 chars.
/// Keys of 11 chars or fewer are fully masked.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

/// Chat-completion client over `reqwest`
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client from config; fails if no API key is configured
    pub fn new(config: &OpenAiConfig) -> crate::Result<Self> {
        let api_key = config.require_api_key()?;
        let api_key = api_key.strip_prefix("Bearer ").unwrap_or(api_key).to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClassificationError::from)?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        tracing::info!(
            endpoint = %endpoint,
            model = %config.model,
            api_key = %mask_token(&api_key),
            "Configured completion client"
        );

        Ok(Self {
            http,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ClassificationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: TEMPERATURE,
        };

        tracing::debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ClassificationError::MalformedResponse(
                    "response has no choices[0].message.content".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("sk-short"), "***");
        assert_eq!(mask_token("sk-proj-abcdefghijklmnop"), "sk-proj***mnop");
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = OpenAiConfig::default();
        assert!(matches!(OpenAiClient::new(&config), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let config = OpenAiConfig {
            api_key: Some("Bearer sk-test".to_string()),
            base_url: "http://localhost:9999/v1/".to_string(),
            ..OpenAiConfig::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
        assert_eq!(client.api_key, "sk-test");
    }
}
