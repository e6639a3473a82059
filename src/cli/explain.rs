//! Explain command: summarizes a commit or diff, or answers a question
//! about it.

use anyhow::Result;
use clap::Parser;

use crate::ai::AiProvider;
use crate::error::AicError;
use crate::git::{GitCommit, GitDiff, GitEntity, GitRepository};
use crate::utils::markdown::print_markdown;
use crate::utils::{check_git_repository, Spinner};

/// Explain command options.
#[derive(Parser, Debug)]
pub struct ExplainCommand {
    /// The commit hash to use.
    #[arg(value_name = "SHA")]
    pub sha: Option<String>,

    /// Explain the current diff.
    #[arg(short, long)]
    pub diff: bool,

    /// Use the staged diff.
    #[arg(short, long)]
    pub staged: bool,

    /// Ask a question instead of requesting a summary.
    #[arg(short, long)]
    pub query: Option<String>,
}

/// What `explain` was asked to look at.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Commit(&'a str),
    Diff { staged: bool },
}

impl ExplainCommand {
    fn target(&self) -> Result<Target<'_>> {
        match (self.sha.as_deref(), self.diff) {
            (Some(sha), false) => Ok(Target::Commit(sha)),
            (None, true) => Ok(Target::Diff {
                staged: self.staged,
            }),
            _ => Err(AicError::Usage("`explain` expects SHA-1 or --diff to be present".to_string())
                .into()),
        }
    }

    /// Executes the explain command.
    pub async fn execute(self, provider: &AiProvider) -> Result<()> {
        let target = self.target()?;
        let repo = check_git_repository()?;
        let entity = load_entity(&repo, &target).await?;
        explain_entity(provider, &entity, self.query.as_deref()).await
    }
}

async fn load_entity(repo: &GitRepository, target: &Target<'_>) -> Result<GitEntity> {
    Ok(match *target {
        Target::Commit(sha) => GitEntity::Commit(GitCommit::load(repo, sha).await?),
        Target::Diff { staged } => GitEntity::Diff(GitDiff::load(repo, staged).await?),
    })
}

/// Prints the entity header and query, then the backend's explanation.
pub async fn explain_entity(
    provider: &AiProvider,
    entity: &GitEntity,
    query: Option<&str>,
) -> Result<()> {
    print_markdown(&entity.header()).await;
    if let Some(query) = query {
        print_markdown(&format!("`query`: {query}")).await;
    }

    let spinner = Spinner::start(if query.is_some() {
        "Generating answer"
    } else {
        "Generating summary"
    });

    match provider.explain(entity, query, true).await {
        Ok(explanation) => {
            spinner.succeed("Analysis complete");
            println!("\n{explanation}");
            Ok(())
        }
        Err(e) => {
            spinner.fail("Failed to generate explanation");
            Err(e)
        }
    }
}
