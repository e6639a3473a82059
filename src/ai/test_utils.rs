//! Shared test utilities for the `ai` module.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::ai::prompts::Prompt;
use crate::ai::provider::ProviderKind;
use crate::ai::{AiClient, AiClientMetadata};

/// Mock AI client with a pre-programmed queue of responses.
///
/// Responses are returned in FIFO order. When the queue is exhausted,
/// subsequent calls return `Err("no more mock responses")`.
///
/// Every call records the prompt it was given. Use
/// [`prompt_handle`](Self::prompt_handle) to keep a handle on the log after
/// the client has been moved into an [`AiProvider`](super::AiProvider).
pub(crate) struct ConfigurableMockAiClient {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    metadata: AiClientMetadata,
    recorded_prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ConfigurableMockAiClient {
    /// Creates a new mock client that will return the given responses in order.
    pub(crate) fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            metadata: AiClientMetadata {
                provider: ProviderKind::Ollama,
                model: "mock-model".to_string(),
            },
            recorded_prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reports a different backend kind from [`AiClient::metadata`].
    pub(crate) fn with_kind(mut self, provider: ProviderKind) -> Self {
        self.metadata.provider = provider;
        self
    }

    /// Returns a handle for inspecting which prompts were sent.
    pub(crate) fn prompt_handle(&self) -> PromptRecordHandle {
        PromptRecordHandle {
            recorded_prompts: self.recorded_prompts.clone(),
        }
    }
}

/// Shared handle to a mock client's recorded prompts.
pub(crate) struct PromptRecordHandle {
    recorded_prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl PromptRecordHandle {
    /// Returns all recorded prompts.
    pub(crate) fn prompts(&self) -> Vec<Prompt> {
        self.recorded_prompts.lock().unwrap().clone()
    }

    /// Returns the number of AI requests that were made.
    pub(crate) fn request_count(&self) -> usize {
        self.recorded_prompts.lock().unwrap().len()
    }
}

impl AiClient for ConfigurableMockAiClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        _stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let responses = self.responses.clone();
        let recorded = self.recorded_prompts.clone();
        let prompt = prompt.clone();
        Box::pin(async move {
            recorded.lock().unwrap().push(prompt);
            responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no more mock responses")))
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        self.metadata.clone()
    }
}
