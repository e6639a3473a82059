//! List command: pick a commit with fzf and explain it.

use std::process::Stdio;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::process::Command;
use tracing::debug;

use super::explain::explain_entity;
use crate::ai::AiProvider;
use crate::error::AicError;
use crate::git::{GitCommit, GitEntity, GitRepository};
use crate::utils::check_git_repository;

const PICKER_PIPELINE: &str = "git log --color=always --format='%C(auto)%h%d %s %C(black)%C(bold)%cr' \
| fzf --ansi --reverse --bind='enter:become(echo {1})' --wrap";

/// How bash and dash report a missing fzf.
const MISSING_FZF: &[&str] = &["fzf: command not found", "fzf: not found"];

/// List command options.
#[derive(Parser, Debug)]
pub struct ListCommand {}

impl ListCommand {
    /// Executes the list command.
    pub async fn execute(self, provider: &AiProvider) -> Result<()> {
        let repo = check_git_repository()?;
        let sha = pick_commit(&repo).await?;
        let commit = GitCommit::load(&repo, &sha).await?;
        explain_entity(provider, &GitEntity::Commit(commit), None).await
    }
}

/// Maps a failed picker run to a command error, pointing at fzf when it is
/// missing.
fn picker_error(stderr: &str) -> AicError {
    let hint = MISSING_FZF
        .iter()
        .any(|marker| stderr.contains(marker))
        .then(|| "`list` command requires fzf".to_string());
    AicError::Command {
        message: stderr.trim().to_string(),
        hint,
    }
}

/// Shows the log in fzf and returns the abbreviated hash the user chose.
async fn pick_commit(repo: &GitRepository) -> Result<String> {
    let output = Command::new("sh")
        .args(["-c", PICKER_PIPELINE])
        .current_dir(repo.workdir())
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to get commit SHA")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(status = ?output.status, %stderr, "Commit picker failed");
        return Err(picker_error(&stderr).into());
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(AicError::Command {
            message: "No commit selected".to_string(),
            hint: None,
        }
        .into());
    }
    Ok(sha)
}
