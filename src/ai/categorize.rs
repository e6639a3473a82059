//! Parsing of categorization responses, with a bounded retry on malformed
//! output.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts::Prompt;
use super::AiClient;
use crate::error::AicError;
use crate::git::FileChange;

/// Number of categorization requests made before giving up.
pub const MAX_ATTEMPTS: u32 = 3;
/// Pause between categorization attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?\s*").unwrap());
static JSON_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^json\s*").unwrap());
static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").unwrap());

/// A named set of files that belong in one commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeGroup {
    /// Short category label, e.g. `documentation`.
    pub category: String,
    /// Files in this group.
    pub files: Vec<FileChange>,
}

/// Attempt bound and pause for categorization requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of requests, including the first.
    pub max_attempts: u32,
    /// Pause between consecutive requests.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Extracts and validates the JSON group array from a backend response.
///
/// Code fences and a leading `json` keyword are stripped, then the first
/// `[{ ... }]` span is parsed. Every group needs a non-empty category and
/// every file both a path and a status.
pub fn parse_groups(response: &str) -> Result<Vec<ChangeGroup>> {
    let cleaned = CODE_FENCE.replace_all(response, "");
    let cleaned = cleaned.trim();
    let cleaned = JSON_KEYWORD.replace(cleaned, "");

    let Some(array) = JSON_ARRAY.find(&cleaned) else {
        bail!("No JSON array found in response");
    };

    let groups: Vec<ChangeGroup> =
        serde_json::from_str(array.as_str()).context("Invalid response format")?;

    if let Some(group) = groups.iter().find(|group| group.category.trim().is_empty()) {
        bail!("Invalid response format: group with {} files has no category", group.files.len());
    }

    Ok(groups)
}

/// Sends the categorize prompt until the response parses.
///
/// Only malformed responses are retried. Backend and transport failures are
/// returned immediately.
pub(crate) async fn request_groups(
    client: &dyn AiClient,
    prompt: &Prompt,
    policy: RetryPolicy,
) -> Result<Vec<ChangeGroup>> {
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            debug!(attempt, max_attempts = policy.max_attempts, "Retrying categorization");
        }

        let response = client.complete(prompt, false).await?;
        debug!(response = %response, "Received categorization response");

        match parse_groups(&response) {
            Ok(groups) => return Ok(groups),
            Err(e) => {
                warn!(attempt, "Categorization response rejected: {e:#}");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(AicError::MaxRetriesExceeded.into())
}
