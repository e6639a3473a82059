//! Commits and diffs as inputs to the AI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::ai::EntityView;
use crate::error::AicError;
use crate::git::GitRepository;

/// A commit whose patch is fetched the first time it is needed.
#[derive(Debug)]
pub struct GitCommit {
    hash: String,
    author: String,
    email: String,
    date: DateTime<FixedOffset>,
    message: String,
    repo: GitRepository,
    diff: OnceCell<String>,
}

impl GitCommit {
    /// Resolves `sha` to a commit and loads its metadata.
    ///
    /// Anything that is not a commit, including refs that start with `-`,
    /// yields [`AicError::CommitNotFound`].
    pub async fn load(repo: &GitRepository, sha: &str) -> Result<Self> {
        let not_found = || AicError::CommitNotFound(sha.to_string());

        if sha.is_empty() || sha.starts_with('-') {
            return Err(not_found().into());
        }

        let kind = repo.run(&["cat-file", "-t", sha]).await.map_err(|_| not_found())?;
        if kind.trim() != "commit" {
            return Err(not_found().into());
        }

        let hash = repo
            .run(&["rev-parse", sha])
            .await
            .map_err(|_| not_found())?
            .trim()
            .to_string();

        let raw = repo
            .run(&["log", "-n", "1", "--format=%an%x00%ae%x00%cI%x00%B", &hash])
            .await?;
        let mut fields = raw.splitn(4, '\0');
        let (Some(author), Some(email), Some(date), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(AicError::Git(format!("Unexpected log output for {hash}")).into());
        };

        let date = DateTime::parse_from_rfc3339(date.trim())
            .with_context(|| format!("Invalid commit date for {hash}: {date}"))?;

        debug!(%hash, %author, "Loaded commit");

        Ok(Self {
            hash,
            author: author.to_string(),
            email: email.to_string(),
            date,
            message: message.trim().to_string(),
            repo: repo.clone(),
            diff: OnceCell::new(),
        })
    }

    /// Full object name.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Author name.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Author email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Committer date.
    pub fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    /// Full commit message, trimmed.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The commit's patch, loaded once.
    pub async fn diff(&self) -> Result<&str> {
        let diff = self
            .diff
            .get_or_try_init(|| async {
                let patch = self
                    .repo
                    .diff_tree(&self.hash)
                    .await
                    .map_err(|_| AicError::CommitNotFound(self.hash.clone()))?;
                if patch.is_empty() {
                    return Err(AicError::CommitNotFound(self.hash.clone()));
                }
                Ok(patch)
            })
            .await?;
        Ok(diff)
    }
}

/// Working-tree or staged changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitDiff {
    staged: bool,
    diff: String,
}

impl GitDiff {
    /// Reads the diff now; an empty diff is an error.
    pub async fn load(repo: &GitRepository, staged: bool) -> Result<Self> {
        let diff = repo.diff(staged).await?;
        Self::from_text(staged, diff)
    }

    /// Wraps diff text obtained elsewhere.
    pub fn from_text(staged: bool, diff: impl Into<String>) -> Result<Self> {
        let diff = diff.into();
        if diff.is_empty() {
            return Err(AicError::EmptyDiff { staged }.into());
        }
        Ok(Self { staged, diff })
    }

    /// Whether this is the index diff.
    pub fn staged(&self) -> bool {
        self.staged
    }

    /// Patch text.
    pub fn text(&self) -> &str {
        &self.diff
    }
}

/// What a command operates on.
#[derive(Debug)]
pub enum GitEntity {
    /// A single commit.
    Commit(GitCommit),
    /// Uncommitted changes.
    Diff(GitDiff),
}

impl GitEntity {
    /// Borrows the text prompts are built from, loading a commit's patch if
    /// necessary.
    pub async fn view(&self) -> Result<EntityView<'_>> {
        Ok(match self {
            Self::Commit(commit) => EntityView::Commit {
                message: commit.message(),
                diff: commit.diff().await?,
            },
            Self::Diff(diff) => EntityView::Diff {
                staged: diff.staged(),
                diff: diff.text(),
            },
        })
    }

    /// Markdown heading shown before an explanation.
    pub fn header(&self) -> String {
        match self {
            Self::Commit(commit) => format!(
                "# Entity: Commit\n`commit {}` | {} <{}> | {}\n\n{}\n-----\n",
                commit.hash(),
                commit.author(),
                commit.email(),
                commit
                    .date()
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                commit.message()
            ),
            Self::Diff(diff) => format!(
                "# Entity: Diff{}\n",
                if diff.staged() { " (staged)" } else { "" }
            ),
        }
    }
}
