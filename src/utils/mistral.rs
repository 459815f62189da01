use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_MODEL: &str = "mistral-large-latest";
const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("completion service returned no content")]
    Empty,
}

/// Generation request sent to a chat completion backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Near-deterministic sampling with room for long record arrays.
    pub fn extraction(system: &str, user: String) -> Self {
        Self {
            system: system.to_string(),
            user,
            temperature: 0.01,
            max_tokens: 8000,
        }
    }
}

/// Anything that turns an instruction pair into free-form text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, request: &'a CompletionRequest) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MistralConfig {
    pub api_key: String,
    pub model: String,
}

impl MistralConfig {
    /// Cleans a key taken from a flag or `.env`-style variable; blank keys are absent.
    pub fn from_raw_key(raw: &str, model: Option<String>) -> Option<Self> {
        let api_key = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

pub struct MistralService {
    client: Client,
    config: MistralConfig,
    endpoint: String,
}

impl MistralService {
    pub fn new(config: MistralConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            config,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionClient for MistralService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest::new(&self.config.model, request);

        debug!(
            model = %self.config.model,
            prompt_chars = request.user.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await?
            .error_for_status();

        match response {
            Ok(response) => {
                let response_text = response.text().await?;
                let parsed = serde_json::from_str::<ChatResponse>(&response_text)?;

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .map(|content| content.trim().to_string())
                    .filter(|content| !content.is_empty())
                    .ok_or(CompletionError::Empty)
            }
            Err(err) => {
                if let Some(status) = err.status() {
                    error!("Mistral API error: Status {}", status);
                    return Err(CompletionError::Api(format!("HTTP Status: {}", status)));
                }
                Err(CompletionError::Request(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_key_is_cleaned() {
        let config = MistralConfig::from_raw_key("  \"abc123\" ", None).expect("config");
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.model, DEFAULT_MODEL);

        let config = MistralConfig::from_raw_key("'k'", Some("mistral-small-latest".into()))
            .expect("config");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.model, "mistral-small-latest");
    }

    #[test]
    fn blank_key_is_absent() {
        assert!(MistralConfig::from_raw_key("", None).is_none());
        assert!(MistralConfig::from_raw_key(" \"\" ", None).is_none());
    }

    #[test]
    fn request_body_shape() {
        let request = CompletionRequest::extraction("sys", "user".to_string());
        let body = ChatRequest::new(DEFAULT_MODEL, &request);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], DEFAULT_MODEL);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "user");
        assert_eq!(value["max_tokens"], 8000);
    }

    #[test]
    fn response_content_is_read_from_first_choice() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"[]"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }
}
