//! Anthropic Messages API generator.
//!
//! One `generate` call is one non-streaming HTTP request. Status codes are
//! mapped onto [`GenerationError`] so the gateway can classify them.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult, GenerationError};
use crate::domain::models::ProviderConfig;
use crate::domain::ports::{GenerationRequest, TextGenerator};

const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic generator.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key; read from `api_key_env` when unset.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub base_url: String,
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self::from_provider(&ProviderConfig::default())
    }
}

impl AnthropicConfig {
    pub fn from_provider(provider: &ProviderConfig) -> Self {
        Self {
            api_key: None,
            api_key_env: provider.api_key_env.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            api_version: API_VERSION.to_string(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get API key from config or environment.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Content block in a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Generator backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicGenerator {
    /// Per-attempt timeouts are enforced by the gateway, not the HTTP client.
    pub fn new(config: AnthropicConfig) -> DomainResult<Self> {
        let client = Client::builder().build().map_err(|e| {
            DomainError::ValidationFailed(format!("Failed to create HTTP client: {e}"))
        })?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.get_api_key().is_some()
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.config.get_api_key().ok_or_else(|| {
            GenerationError::Authentication(format!("{} not set", self.config.api_key_env))
        })?;

        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Network(format!("failed to decode response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
