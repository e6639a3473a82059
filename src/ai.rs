//! AI client trait and the shared HTTP plumbing of the backend adapters.

pub mod categorize;
pub mod claude;
pub mod ollama;
pub mod openai;
pub mod phind;
pub mod prompts;
pub mod provider;

#[cfg(test)]
pub(crate) mod test_utils;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::ai::prompts::Prompt;
use crate::ai::provider::ProviderKind;
use crate::error::AicError;

pub use categorize::{ChangeGroup, RetryPolicy};
pub use prompts::EntityView;
pub use provider::AiProvider;

/// HTTP request timeout for AI API calls.
///
/// Generous enough for slow local models while preventing indefinite hangs.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Metadata about an AI client implementation.
#[derive(Clone, Debug)]
pub struct AiClientMetadata {
    /// Backend the client talks to.
    pub provider: ProviderKind,
    /// Model identifier.
    pub model: String,
}

/// Trait for AI service clients.
///
/// One implementation per backend; each translates the generic [`Prompt`]
/// into its own request shape and its response back into plain text.
pub trait AiClient: Send + Sync {
    /// Sends the prompt and returns the full completion text.
    ///
    /// `stream` is a hint: backends that support incremental output may use
    /// it, but the returned future always resolves to the complete text.
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Returns metadata about the client.
    fn metadata(&self) -> AiClientMetadata;
}

// ── Shared helpers for AI client implementations ────────────────────

/// Builds an HTTP client with the standard request timeout.
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Joins a base URL and an endpoint path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// How a backend reports errors in a non-success response body.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ErrorBody {
    /// `{"error": {"message": "..."}}`.
    Json,
    /// The raw body is the message.
    Text,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Checks an HTTP response for error status.
///
/// On success, returns the response unchanged for further processing. On
/// failure, reads the body and returns an [`AicError::Provider`] carrying the
/// status code, whatever the body looks like.
pub(crate) async fn check_error_response(
    response: reqwest::Response,
    body: ErrorBody,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_else(|e| {
        tracing::debug!("Failed to read error response body: {e}");
        String::new()
    });

    Err(AicError::provider(error_message(&text, body), status.as_u16()).into())
}

fn error_message(text: &str, body: ErrorBody) -> String {
    let message = match body {
        ErrorBody::Json => serde_json::from_str::<ErrorEnvelope>(text)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|detail| detail.message),
        ErrorBody::Text => Some(text.trim().to_string()),
    };

    message
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Maps a transport failure to [`AicError::Network`].
pub(crate) fn network_error(err: &reqwest::Error) -> AicError {
    AicError::Network(err.to_string())
}

/// Rejects missing or empty completion text.
pub(crate) fn require_completion(content: Option<String>) -> Result<String> {
    content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AicError::NoCompletion.into())
}

/// Logs successful text extraction from an AI API response.
pub(crate) fn log_response_success(provider: ProviderKind, result: &Result<String>) {
    if let Ok(text) = result {
        tracing::debug!(
            response_len = text.len(),
            "Successfully extracted text content from {} API response",
            provider
        );
        tracing::debug!(response_content = %text, "{} API response content", provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://localhost:11434/", "/api/generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            endpoint("https://api.openai.com", "/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn json_error_message_is_extracted() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
        assert_eq!(error_message(body, ErrorBody::Json), "Invalid API key");
    }

    #[test]
    fn unparsable_json_error_falls_back() {
        assert_eq!(error_message("<html>502</html>", ErrorBody::Json), "Unknown error");
        assert_eq!(error_message("", ErrorBody::Json), "Unknown error");
        assert_eq!(error_message("{}", ErrorBody::Json), "Unknown error");
    }

    #[test]
    fn text_error_uses_raw_body() {
        assert_eq!(error_message("model not found\n", ErrorBody::Text), "model not found");
        assert_eq!(error_message("   ", ErrorBody::Text), "Unknown error");
    }

    #[test]
    fn empty_completion_is_rejected() {
        for content in [None, Some(String::new()), Some("  \n".to_string())] {
            let err = require_completion(content).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AicError>(),
                Some(AicError::NoCompletion)
            ));
        }
        assert_eq!(require_completion(Some("ok".to_string())).unwrap(), "ok");
    }
}
