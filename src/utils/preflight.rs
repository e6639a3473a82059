//! Preflight validation checks for early failure detection
//!
//! Commands call these before any git or network work so misconfiguration
//! fails fast with a clear message.

use anyhow::Result;
use tracing::debug;

use crate::ai::provider::ProviderKind;
use crate::error::AicError;
use crate::git::GitRepository;

/// Validate we're in a valid git repository
///
/// This is a lightweight check that opens the repository without
/// loading any commit data.
pub fn check_git_repository() -> Result<GitRepository> {
    GitRepository::open().map_err(|e| {
        debug!(error = %e, "Repository discovery failed");
        AicError::Usage(
            "Not in a git repository. Please run this command from within a git repository."
                .to_string(),
        )
        .into()
    })
}

/// Validate the selected backend can run `batch`.
///
/// Phind's endpoint cannot reliably produce the structured output batch
/// needs.
pub fn check_batch_provider(provider: ProviderKind) -> Result<()> {
    if provider == ProviderKind::Phind {
        return Err(AicError::UnsupportedProvider(
            "Batch command is not available with Phind provider due to API limitations"
                .to_string(),
        )
        .into());
    }
    Ok(())
}

/// Combined preflight check for `batch`
///
/// Validates:
/// - The backend supports batch
/// - Git repository access
pub fn check_batch_prerequisites(provider: ProviderKind) -> Result<GitRepository> {
    check_batch_provider(provider)?;
    check_git_repository()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_rejects_phind() {
        let err = check_batch_provider(ProviderKind::Phind).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Batch command is not available with Phind provider due to API limitations"
        );
        assert!(matches!(
            err.downcast_ref::<AicError>(),
            Some(AicError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn batch_accepts_other_backends() {
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Claude,
            ProviderKind::Groq,
            ProviderKind::Ollama,
        ] {
            assert!(check_batch_provider(kind).is_ok());
        }
    }
}
