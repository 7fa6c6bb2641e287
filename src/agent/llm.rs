//! Text generation capability
//!
//! The assistant only needs `generate(prompt) -> text`. [`MistralClient`]
//! implements it against an OpenAI-compatible chat-completions endpoint.

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Produces a completion for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Complete `prompt`. Transport, quota and empty responses are errors.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Mistral chat-completions client
pub struct MistralClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl MistralClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::build(api_key.into(), &LlmConfig::default())
    }

    /// Create a client from configuration and an already resolved key.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::build(api_key.into(), config)
    }

    fn build(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for MistralClient {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed: ChatResponse = response.json().await?;
        extract_content(parsed)
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let detail: String = body.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        Error::Llm(format!("quota exceeded ({status}): {detail}"))
    } else {
        Error::Llm(format!("request failed ({status}): {detail}"))
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Llm("empty completion".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "mistral-small-latest",
            temperature: 0.1,
            messages: vec![ChatMessage {
                role: "user",
                content: "Bonjour",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "mistral-small-latest");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Bonjour");
    }

    #[test]
    fn test_extract_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Le CA est stable. "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "Le CA est stable.");
    }

    #[test]
    fn test_extract_empty_completion() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_content(parsed), Err(Error::Llm(_))));

        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(extract_content(parsed), Err(Error::Llm(_))));
    }

    #[test]
    fn test_status_error_quota() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "rate limited");
        assert!(err.to_string().contains("quota exceeded"));
        let err = status_error(StatusCode::UNAUTHORIZED, "bad key");
        assert!(err.to_string().contains("request failed (401 Unauthorized)"));
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = MistralClient::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:9999/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
        assert_eq!(client.model(), "mistral-small-latest");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let client = MistralClient::new("sk-test")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert!(client.generate("Bonjour").await.is_err());
    }
}
