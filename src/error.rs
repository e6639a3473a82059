//! Error family shared by every command.

use thiserror::Error;

use crate::ai::provider::ProviderKind;

/// Recoverable errors raised by aic.
///
/// Anything of this type reaching the entry point is printed as
/// `Error: <message>`; any other error is reported as unexpected. All of
/// them exit with status 1.
#[derive(Error, Debug)]
pub enum AicError {
    /// Invalid invocation or an operation that does not apply to its input.
    #[error("{0}")]
    Usage(String),

    /// The reference does not name a commit.
    #[error("Commit '{0}' not found")]
    CommitNotFound(String),

    /// The requested diff has no content.
    #[error("diff{} is empty", staged_suffix(.staged))]
    EmptyDiff {
        /// Whether the staged diff was requested.
        staged: bool,
    },

    /// A git subprocess failed.
    #[error("Git operation failed: {0}")]
    Git(String),

    /// An external helper command failed.
    #[error("{message}{}", hint_suffix(.hint))]
    Command {
        /// What the command reported.
        message: String,
        /// Optional pointer at the fix.
        hint: Option<String>,
    },

    /// A backend that needs an API key was selected without one.
    #[error("Missing API key for {0}, use --api-key or AIC_API_KEY env variable")]
    MissingApiKey(ProviderKind),

    /// A backend that needs a model name was selected without one.
    #[error("Missing Model for {0}, use --model or AIC_MODEL env variable")]
    MissingModel(ProviderKind),

    /// The provider name is not one of the supported backends.
    #[error("Unknown provider type: {0}")]
    UnknownProvider(String),

    /// The backend answered with a non-success status.
    #[error("{message}{}", status_suffix(.status))]
    Provider {
        /// Backend-supplied message, or `Unknown error`.
        message: String,
        /// HTTP status code, when one was received.
        status: Option<u16>,
    },

    /// The backend answered successfully but without any completion text.
    #[error("No completion choice available")]
    NoCompletion,

    /// The local backend is not running.
    #[error("Could not connect to Ollama. Make sure it is running (`ollama serve`)")]
    BackendUnreachable,

    /// Transport-level failure talking to a backend.
    #[error("Network error: {0}")]
    Network(String),

    /// Categorization output stayed malformed for every attempt.
    #[error("Failed to get proper response format after maximum retries. Please try again.")]
    MaxRetriesExceeded,

    /// The selected backend cannot run this command.
    #[error("{0}")]
    UnsupportedProvider(String),
}

impl AicError {
    /// Builds a [`AicError::Provider`] carrying an HTTP status.
    pub fn provider(message: impl Into<String>, status: u16) -> Self {
        Self::Provider {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Returns the HTTP status carried by a provider error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

fn staged_suffix(staged: &bool) -> &'static str {
    if *staged {
        " (staged)"
    } else {
        ""
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|hint| format!(" (hint: {hint})"))
        .unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (HTTP {status})"))
        .unwrap_or_default()
}

/// Finds the first [`AicError`] in an error chain.
pub fn find_aic_error(err: &anyhow::Error) -> Option<&AicError> {
    err.downcast_ref::<AicError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<AicError>()))
}
