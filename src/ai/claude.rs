//! Anthropic Messages API client.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::prompts::Prompt;
use super::provider::ProviderKind;
use super::{
    build_http_client, check_error_response, endpoint, log_response_success, network_error,
    require_completion, AiClient, AiClientMetadata, ErrorBody,
};
use crate::error::AicError;

/// Default Anthropic API host.
pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
/// Default Claude model.
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const MESSAGES_PATH: &str = "/v1/messages";
const MAX_TOKENS: u32 = 4096;

/// Claude API request message.
#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Claude API request body.
#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

/// Claude API response content block.
#[derive(Deserialize)]
struct Content {
    text: Option<String>,
}

/// Claude API response.
#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<Content>,
}

/// Claude API client implementation.
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeClient {
    /// Creates a new Claude client.
    pub fn new(api_key: String, model: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            model: model.unwrap_or_else(|| CLAUDE_DEFAULT_MODEL.to_string()),
            base_url: CLAUDE_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl AiClient for ClaudeClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        _stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                system_prompt_len = prompt.system().len(),
                user_prompt_len = prompt.user().len(),
                model = %self.model,
                "Preparing Claude API request"
            );

            let request = ClaudeRequest {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                system: prompt.system(),
                messages: vec![Message {
                    role: "user",
                    content: prompt.user(),
                }],
            };

            let api_url = endpoint(&self.base_url, MESSAGES_PATH);
            info!(url = %api_url, model = %self.model, max_tokens = MAX_TOKENS, "Sending request to Claude API");

            let response = self
                .client
                .post(&api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
                .send()
                .await
                .map_err(|e| network_error(&e))?;

            let response = check_error_response(response, ErrorBody::Json).await?;

            let claude_response: ClaudeResponse = response
                .json()
                .await
                .map_err(|e| AicError::Network(format!("Invalid response body: {e}")))?;

            debug!(
                content_count = claude_response.content.len(),
                "Received Claude API response"
            );

            let content = claude_response
                .content
                .into_iter()
                .next()
                .and_then(|block| block.text);

            let result = require_completion(content);
            log_response_success(ProviderKind::Claude, &result);
            result
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: ProviderKind::Claude,
            model: self.model.clone(),
        }
    }
}
