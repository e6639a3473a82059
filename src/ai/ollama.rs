//! Local Ollama `/api/generate` client.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::prompts::Prompt;
use super::provider::ProviderKind;
use super::{
    build_http_client, check_error_response, endpoint, log_response_success, require_completion,
    AiClient, AiClientMetadata, ErrorBody,
};
use crate::error::AicError;

/// Default Ollama host.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 100;

const GENERATE_PATH: &str = "/api/generate";

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

/// One generate response, or one chunk of a streamed response.
#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Splits a byte stream into newline-terminated lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte
/// character, so bytes are buffered until a full line is available.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=idx).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| String::from_utf8_lossy(&self.pending).into_owned())
    }
}

/// Extracts the text fragment of one streamed line; unparsable lines are
/// skipped.
fn fragment(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str::<GenerateResponse>(line)
        .ok()
        .and_then(|chunk| chunk.response)
}

/// Ollama API client.
pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OllamaClient {
    /// Creates a client for the local Ollama server.
    pub fn new(model: String, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            model,
            base_url: OLLAMA_BASE_URL.to_string(),
            max_tokens,
        })
    }

    /// Points the client at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt.combined(),
            stream,
            options: GenerateOptions {
                num_predict: self.max_tokens,
            },
        };

        let api_url = endpoint(&self.base_url, GENERATE_PATH);
        info!(url = %api_url, model = %self.model, stream, "Sending request to Ollama API");

        let response = self
            .client
            .post(&api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AicError::BackendUnreachable
                } else {
                    AicError::Network(e.to_string())
                }
            })?;

        check_error_response(response, ErrorBody::Text).await
    }

    /// Folds the streamed chunks into the full completion text.
    async fn collect_stream(response: reqwest::Response) -> Result<String> {
        let mut chunks = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut text = String::new();
        let mut fragments = 0usize;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| AicError::Network(e.to_string()))?;
            for line in lines.push(&chunk) {
                if let Some(part) = fragment(&line) {
                    fragments += 1;
                    text.push_str(&part);
                }
            }
        }
        if let Some(part) = lines.finish().as_deref().and_then(fragment) {
            fragments += 1;
            text.push_str(&part);
        }

        debug!(fragments, "Collected streamed Ollama response");
        Ok(text)
    }
}

impl AiClient for OllamaClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                prompt_len = prompt.system().len() + prompt.user().len(),
                model = %self.model,
                max_tokens = self.max_tokens,
                "Preparing Ollama request"
            );

            let response = self.send(prompt, stream).await?;

            let content = if stream {
                Some(Self::collect_stream(response).await?)
            } else {
                let generated: GenerateResponse = response
                    .json()
                    .await
                    .map_err(|e| AicError::Network(format!("Invalid response body: {e}")))?;
                generated.response
            };

            let result = require_completion(content);
            log_response_success(ProviderKind::Ollama, &result);
            result
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: ProviderKind::Ollama,
            model: self.model.clone(),
        }
    }
}
