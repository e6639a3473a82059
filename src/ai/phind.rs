//! Phind agent endpoint client.
//!
//! The endpoint answers with a server-sent event stream; the full body is
//! read and the `delta` fragments are concatenated.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
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

/// Phind extension API host.
pub const PHIND_BASE_URL: &str = "https://https.extension.phind.com";
/// Agent endpoint path, appended to the host.
pub const PHIND_AGENT_PATH: &str = "/agent/";
/// Default Phind model.
pub const PHIND_DEFAULT_MODEL: &str = "Phind-70B";

const DATA_PREFIX: &str = "data: ";

#[derive(Serialize)]
struct HistoryEntry<'a> {
    content: &'a str,
    role: &'static str,
}

#[derive(Serialize)]
struct PhindRequest<'a> {
    additional_extension_context: &'static str,
    allow_magic_buttons: bool,
    is_vscode_extension: bool,
    message_history: Vec<HistoryEntry<'a>>,
    requested_model: &'a str,
    user_input: &'a str,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

fn parse_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    serde_json::from_str::<StreamEvent>(payload)
        .ok()?
        .choices
        .into_iter()
        .next()?
        .delta?
        .content
}

/// Concatenates the content fragments of every `data:` line in order.
pub(crate) fn parse_stream(body: &str) -> String {
    body.lines().filter_map(parse_line).collect()
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(""));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("Identity"));
    headers
}

/// Phind API client. No API key is required.
pub struct PhindClient {
    client: Client,
    model: String,
    base_url: String,
}

impl PhindClient {
    /// Creates a new Phind client.
    pub fn new(model: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            model: model.unwrap_or_else(|| PHIND_DEFAULT_MODEL.to_string()),
            base_url: PHIND_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different host; the agent path is kept.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl AiClient for PhindClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        _stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            // Phind has no system role, so both parts travel as one message.
            let input = prompt.combined();
            let request = PhindRequest {
                additional_extension_context: "",
                allow_magic_buttons: true,
                is_vscode_extension: true,
                message_history: vec![HistoryEntry {
                    content: &input,
                    role: "user",
                }],
                requested_model: &self.model,
                user_input: &input,
            };

            let url = endpoint(&self.base_url, PHIND_AGENT_PATH);
            info!(%url, model = %self.model, "Sending request to Phind API");

            let response = self
                .client
                .post(&url)
                .headers(default_headers())
                .json(&request)
                .send()
                .await
                .map_err(|e| network_error(&e))?;

            let response = check_error_response(response, ErrorBody::Text).await?;

            let body = response
                .text()
                .await
                .map_err(|e| AicError::Network(format!("Invalid response body: {e}")))?;
            debug!(body_len = body.len(), "Received Phind event stream");

            let result = require_completion(Some(parse_stream(&body)));
            log_response_success(ProviderKind::Phind, &result);
            result
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: ProviderKind::Phind,
            model: self.model.clone(),
        }
    }
}
