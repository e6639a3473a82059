//! OpenAI-compatible chat completions client (OpenAI and Groq).

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

/// Default OpenAI API host.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default Groq API host (OpenAI-compatible surface).
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
/// Default OpenAI model.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
/// Default Groq model.
pub const GROQ_DEFAULT_MODEL: &str = "mixtral-8x7b-32768";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Chat request message.
#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat completions request body.
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

/// Chat completions response.
#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI-style `/v1/chat/completions` backends.
pub struct OpenAiClient {
    client: Client,
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client for an OpenAI-compatible backend.
    pub fn new(kind: ProviderKind, api_key: String, model: String, base_url: String) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            kind,
            api_key,
            model,
            base_url,
        })
    }

    /// Creates a client for the OpenAI API.
    pub fn new_openai(api_key: String, model: Option<String>) -> Result<Self> {
        Self::new(
            ProviderKind::OpenAi,
            api_key,
            model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            OPENAI_BASE_URL.to_string(),
        )
    }

    /// Creates a client for the Groq API.
    pub fn new_groq(api_key: String, model: Option<String>) -> Result<Self> {
        Self::new(
            ProviderKind::Groq,
            api_key,
            model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            GROQ_BASE_URL.to_string(),
        )
    }

    /// Points the client at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_url(&self) -> String {
        endpoint(&self.base_url, CHAT_COMPLETIONS_PATH)
    }
}

impl AiClient for OpenAiClient {
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
                provider = %self.kind,
                "Preparing chat completions request"
            );

            let request = ChatRequest {
                model: &self.model,
                messages: vec![
                    Message {
                        role: "system",
                        content: prompt.system(),
                    },
                    Message {
                        role: "user",
                        content: prompt.user(),
                    },
                ],
            };

            let api_url = self.api_url();
            info!(url = %api_url, model = %self.model, "Sending request to {} API", self.kind);

            let response = self
                .client
                .post(&api_url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| network_error(&e))?;

            let response = check_error_response(response, ErrorBody::Json).await?;

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| AicError::Network(format!("Invalid response body: {e}")))?;

            debug!(choice_count = chat.choices.len(), "Received chat completions response");

            let content = chat
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message)
                .and_then(|message| message.content);

            let result = require_completion(content);
            log_response_success(self.kind, &result);
            result
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: self.kind,
            model: self.model.clone(),
        }
    }
}
