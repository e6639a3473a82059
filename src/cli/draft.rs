//! Draft command: drafts a commit message for the staged changes.

use std::sync::LazyLock;

use anyhow::Result;
use clap::Parser;
use regex::Regex;
use tracing::{debug, warn};

use crate::ai::AiProvider;
use crate::git::{GitDiff, GitEntity};
use crate::utils::{check_git_repository, clipboard, Spinner};

static MARKDOWN_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_#`]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduces a backend reply to a single plain commit subject line.
///
/// Keeps the first line, drops markdown characters and collapses runs of
/// whitespace.
pub fn clean_commit_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    let plain = MARKDOWN_CHARS.replace_all(first_line, "");
    WHITESPACE.replace_all(&plain, " ").trim().to_string()
}

/// Draft command options.
#[derive(Parser, Debug)]
pub struct DraftCommand {
    /// Add context to communicate intent.
    #[arg(short, long)]
    pub context: Option<String>,
}

impl DraftCommand {
    /// Executes the draft command.
    pub async fn execute(self, provider: &AiProvider) -> Result<()> {
        let repo = check_git_repository()?;
        let entity = GitEntity::Diff(GitDiff::load(&repo, true).await?);
        debug!(context = ?self.context, "Drafting commit message");

        let spinner = Spinner::start("Generating commit message...");
        let draft = match provider.draft(&entity, self.context.as_deref()).await {
            Ok(draft) => draft,
            Err(e) => {
                spinner.fail("Failed to generate commit message");
                return Err(e);
            }
        };

        let message = clean_commit_message(&draft);

        match clipboard::copy(&message).await {
            Ok(()) => spinner.succeed("Done - Commit message copied to clipboard"),
            Err(e) => {
                warn!("Clipboard copy failed: {e:#}");
                spinner.succeed("Done");
                eprintln!("Warning: Could not copy to clipboard");
            }
        }
        println!("\n{message}");
        Ok(())
    }
}
