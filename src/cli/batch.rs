//! Batch command: groups uncommitted changes with the backend and commits
//! each group with a drafted message.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

use super::draft::clean_commit_message;
use crate::ai::{AiProvider, ChangeGroup, RetryPolicy};
use crate::error::AicError;
use crate::git::{FileChange, GitDiff, GitEntity, GitRepository};
use crate::utils::{check_batch_prerequisites, Spinner};

/// Batch command options.
#[derive(Parser, Debug)]
pub struct BatchCommand {}

impl BatchCommand {
    /// Executes the batch command.
    pub async fn execute(self, provider: &AiProvider) -> Result<()> {
        let repo = check_batch_prerequisites(provider.kind())?;
        let summary = run_batch(provider, &repo, RetryPolicy::default()).await?;
        if !summary.commits.is_empty() {
            println!("\n✨ All changes have been committed successfully!");
        }
        Ok(())
    }
}

/// One commit created by a batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchCommit {
    /// Category the backend assigned.
    pub category: String,
    /// Cleaned commit subject.
    pub message: String,
    /// Paths staged for this commit.
    pub files: Vec<String>,
}

/// Outcome of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Commits in creation order.
    pub commits: Vec<BatchCommit>,
    /// Groups skipped because none of their files were left to commit,
    /// either already committed earlier in the run or not reported by git.
    pub skipped: Vec<String>,
}

/// Categorizes the uncommitted changes and commits each group in turn.
///
/// A path is staged at most once per run, even if the backend lists it in
/// several groups. The first failure aborts the run; commits made before it
/// stay in place.
pub async fn run_batch(
    provider: &AiProvider,
    repo: &GitRepository,
    policy: RetryPolicy,
) -> Result<BatchSummary> {
    let spinner = Spinner::start("Analyzing changes");
    let mut summary = BatchSummary::default();

    let changes = match repo.uncommitted_changes().await {
        Ok(changes) => changes,
        Err(e) => {
            spinner.fail("Failed to process changes");
            return Err(e);
        }
    };
    if changes.is_empty() {
        spinner.fail("No changes found");
        return Ok(summary);
    }
    debug!(count = changes.len(), ?changes, "Found changes");

    spinner.set_message("Categorizing changes with AI");
    let groups = match provider.categorize_groups(&changes, policy).await {
        Ok(groups) => groups,
        Err(e) => {
            spinner.fail("Failed to process changes");
            return Err(e);
        }
    };
    spinner.succeed(format!("Found {} groups of changes", groups.len()));

    let known: HashMap<&str, &FileChange> = changes
        .iter()
        .map(|change| (change.path.as_str(), change))
        .collect();
    let mut processed: HashSet<String> = HashSet::new();

    for group in &groups {
        let pending = pending_files(group, &known, &processed);
        if pending.is_empty() {
            debug!(category = %group.category, "Skipping group, files already processed");
            summary.skipped.push(group.category.clone());
            continue;
        }

        let spinner = Spinner::start(format!("Processing {}", group.category));
        match commit_group(provider, repo, group, &pending, &known, &mut processed, &spinner).await {
            Ok(commit) => {
                spinner.succeed(format!("Committed changes in {}", group.category));
                summary.commits.push(commit);
            }
            Err(e) => {
                spinner.fail(format!("Failed to process {}", group.category));
                return Err(e);
            }
        }
    }

    Ok(summary)
}

/// Paths of `group` that still need committing, in order and without
/// duplicates. Paths git did not report as changed are dropped.
fn pending_files(
    group: &ChangeGroup,
    known: &HashMap<&str, &FileChange>,
    processed: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    group
        .files
        .iter()
        .map(|FileChange { path, .. }| path.as_str())
        .filter(|path| {
            if known.contains_key(path) {
                true
            } else {
                warn!(category = %group.category, path, "Ignoring file not reported by git");
                false
            }
        })
        .filter(|path| !processed.contains(*path) && seen.insert(*path))
        .map(str::to_string)
        .collect()
}

async fn commit_group(
    provider: &AiProvider,
    repo: &GitRepository,
    group: &ChangeGroup,
    pending: &[String],
    known: &HashMap<&str, &FileChange>,
    processed: &mut HashSet<String>,
    spinner: &Spinner,
) -> Result<BatchCommit> {
    for path in pending {
        // Staged deletions and the like have nothing left for `git add`.
        if known.get(path.as_str()).is_some_and(|change| change.index_only) {
            debug!(%path, "Already staged");
        } else {
            spinner.set_message(format!("Staging {path}"));
            repo.stage(path).await?;
        }
        processed.insert(path.clone());
    }

    spinner.set_message("Generating commit message");
    let entity = GitEntity::Diff(GitDiff::load(repo, true).await?);
    let context = format!("Category: {}\nFiles: {}", group.category, pending.join(", "));
    let message = clean_commit_message(&provider.draft(&entity, Some(&context)).await?);
    if message.is_empty() {
        return Err(AicError::NoCompletion.into());
    }

    spinner.set_message("Creating commit");
    repo.commit(&message).await?;
    debug!(category = %group.category, %message, "Created commit");

    Ok(BatchCommit {
        category: group.category.clone(),
        message,
        files: pending.to_vec(),
    })
}
