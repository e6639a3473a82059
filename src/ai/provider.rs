//! Backend selection and the facade every command talks through.

use std::fmt;

use anyhow::Result;
use clap::ValueEnum;
use tracing::debug;

use super::categorize::{request_groups, ChangeGroup, RetryPolicy};
use super::claude::ClaudeClient;
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use super::phind::PhindClient;
use super::{prompts, AiClient};
use crate::config::AiConfig;
use crate::error::AicError;
use crate::git::{FileChange, GitEntity};

/// Supported AI backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum ProviderKind {
    /// OpenAI chat completions.
    #[value(name = "openai")]
    OpenAi,
    /// Anthropic Messages API.
    Claude,
    /// Groq's OpenAI-compatible API.
    Groq,
    /// Local Ollama server.
    Ollama,
    /// Phind agent endpoint; needs no key.
    #[default]
    Phind,
}

impl ProviderKind {
    /// Parses a provider name, ignoring case.
    pub fn parse(name: &str) -> Result<Self, AicError> {
        <Self as ValueEnum>::from_str(name.trim(), true)
            .map_err(|_| AicError::UnknownProvider(name.to_string()))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "OpenAI",
            Self::Claude => "Claude",
            Self::Groq => "Groq",
            Self::Ollama => "Ollama",
            Self::Phind => "Phind",
        };
        f.write_str(name)
    }
}

/// Builds the adapter for a resolved configuration.
fn build_client(config: &AiConfig) -> Result<Box<dyn AiClient>> {
    let kind = config.provider;
    let api_key = || {
        config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AicError::MissingApiKey(kind))
    };
    let model = config.model.clone();
    let base_url = config.base_url.clone();

    let client: Box<dyn AiClient> = match kind {
        ProviderKind::OpenAi => {
            let client = OpenAiClient::new_openai(api_key()?, model)?;
            Box::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
        ProviderKind::Groq => {
            let client = OpenAiClient::new_groq(api_key()?, model)?;
            Box::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
        ProviderKind::Claude => {
            let client = ClaudeClient::new(api_key()?, model)?;
            Box::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
        ProviderKind::Ollama => {
            let model = model.ok_or(AicError::MissingModel(kind))?;
            let client = OllamaClient::new(model, config.max_tokens)?;
            Box::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
        ProviderKind::Phind => {
            let client = PhindClient::new(model)?;
            Box::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
    };
    Ok(client)
}

/// The single entry point for explain, draft and categorize requests.
///
/// Bound to one backend for its whole lifetime.
pub struct AiProvider {
    client: Box<dyn AiClient>,
}

impl AiProvider {
    /// Selects and constructs the backend named by `config`.
    ///
    /// Fails before any request is made when a required key or model is
    /// missing.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = build_client(config)?;
        let metadata = client.metadata();
        debug!(provider = %metadata.provider, model = %metadata.model, "Selected AI backend");
        Ok(Self { client })
    }

    /// Wraps an already constructed client.
    pub fn from_client(client: Box<dyn AiClient>) -> Self {
        Self { client }
    }

    /// Backend this provider talks to.
    pub fn kind(&self) -> ProviderKind {
        self.client.metadata().provider
    }

    /// Model identifier sent to the backend.
    pub fn model(&self) -> String {
        self.client.metadata().model
    }

    /// Explains a commit or diff, or answers `query` about it.
    pub async fn explain(
        &self,
        entity: &GitEntity,
        query: Option<&str>,
        stream: bool,
    ) -> Result<String> {
        let view = entity.view().await?;
        let prompt = prompts::explain(&view, query);
        self.client.complete(&prompt, stream).await
    }

    /// Drafts a single-line conventional commit message for a diff.
    pub async fn draft(&self, entity: &GitEntity, context: Option<&str>) -> Result<String> {
        let view = entity.view().await?;
        let prompt = prompts::draft(&view, context)?;
        self.client.complete(&prompt, false).await
    }

    /// Asks for a grouping of `changes` and returns the raw response text.
    pub async fn categorize(&self, changes: &[FileChange]) -> Result<String> {
        let prompt = prompts::categorize(changes)?;
        self.client.complete(&prompt, false).await
    }

    /// Asks for a grouping of `changes`, re-asking while the response is
    /// malformed.
    pub async fn categorize_groups(
        &self,
        changes: &[FileChange],
        policy: RetryPolicy,
    ) -> Result<Vec<ChangeGroup>> {
        let prompt = prompts::categorize(changes)?;
        request_groups(self.client.as_ref(), &prompt, policy).await
    }
}
