//! Git repository operations

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use git2::Repository;
use tokio::process::Command;
use tracing::debug;

use crate::error::AicError;
use crate::git::status::{parse_name_status, parse_porcelain, FileChange};

/// Configuration overrides applied to every git invocation so output is
/// stable regardless of user settings.
const GIT_CONFIG: &[&str] = &[
    "-c",
    "core.autocrlf=false",
    "-c",
    "core.safecrlf=false",
    "-c",
    "core.eol=lf",
    "-c",
    "advice.statusHints=false",
    "-c",
    "advice.statusUoption=false",
    "-c",
    "core.fileMode=false",
    "-c",
    "core.quotePath=false",
];

/// Environment that keeps git from prompting.
const GIT_ENV: &[(&str, &str)] = &[
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GIT_ASKPASS", "echo"),
    ("LC_ALL", "C"),
];

/// Time allowed for staging one path.
pub const STAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for creating one commit.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(15);

const GPG_LOCK_MARKER: &str = "gpg: waiting for lock";

/// Git repository wrapper.
///
/// Repository discovery goes through libgit2; everything else runs the git
/// binary in the working tree.
#[derive(Clone, Debug)]
pub struct GitRepository {
    workdir: PathBuf,
}

impl GitRepository {
    /// Open the repository containing the current directory
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;
        Self::from_repository(&repo)
    }

    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Self::from_repository(&repo)
    }

    fn from_repository(repo: &Repository) -> Result<Self> {
        let workdir = repo
            .workdir()
            .context("Repository has no working directory")?
            .to_path_buf();
        Ok(Self { workdir })
    }

    /// Get workdir path
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command
            .args(GIT_CONFIG)
            .args(args)
            .current_dir(&self.workdir)
            .envs(GIT_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Runs git and returns its stdout.
    ///
    /// A non-zero exit becomes [`AicError::Git`] carrying stderr.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "Running git");
        let output = self
            .command(args)
            .output()
            .await
            .context("Failed to execute git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(?args, status = ?output.status, %stderr, "git failed");
            let message = if stderr.is_empty() {
                format!("git {} exited with {}", args.join(" "), output.status)
            } else {
                stderr
            };
            return Err(AicError::Git(message).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Like [`run`](Self::run), but the process is killed after `limit`.
    pub async fn run_with_timeout(&self, args: &[&str], limit: Duration) -> Result<String> {
        match tokio::time::timeout(limit, self.run(args)).await {
            Ok(result) => result,
            Err(_) => Err(AicError::Git(format!(
                "git {} timed out after {}s",
                args.join(" "),
                limit.as_secs()
            ))
            .into()),
        }
    }

    /// Working-tree diff, or the index diff when `staged`.
    pub async fn diff(&self, staged: bool) -> Result<String> {
        let args: &[&str] = if staged {
            &["diff", "--staged"]
        } else {
            &["diff"]
        };
        self.run(args).await
    }

    /// Patch of a single commit, including root commits.
    pub async fn diff_tree(&self, hash: &str) -> Result<String> {
        self.run(&[
            "diff-tree",
            "-p",
            "--binary",
            "--no-color",
            "--compact-summary",
            "--root",
            hash,
        ])
        .await
    }

    /// Files with uncommitted changes, from `git status --porcelain -z`.
    pub async fn uncommitted_changes(&self) -> Result<Vec<FileChange>> {
        let output = self.run(&["status", "--porcelain", "-z"]).await?;
        Ok(parse_porcelain(&output))
    }

    /// Files in the working-tree or index diff, from `--name-status`.
    pub async fn changed_files(&self, staged: bool) -> Result<Vec<FileChange>> {
        let args: &[&str] = if staged {
            &["diff", "--name-status", "-z", "--staged"]
        } else {
            &["diff", "--name-status", "-z"]
        };
        let output = self.run(args).await?;
        Ok(parse_name_status(&output))
    }

    /// Stages one path.
    pub async fn stage(&self, path: &str) -> Result<()> {
        self.run_with_timeout(&["add", "--", path], STAGE_TIMEOUT)
            .await?;
        Ok(())
    }

    /// Commits the index without signing.
    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run_with_timeout(&["commit", "--no-gpg-sign", "-m", message], COMMIT_TIMEOUT)
            .await
            .map_err(explain_commit_failure)?;
        Ok(())
    }
}

/// A commit stuck on the GPG agent gets a hint; anything else passes through.
fn explain_commit_failure(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<AicError>() {
        Some(AicError::Git(stderr)) if stderr.contains(GPG_LOCK_MARKER) => AicError::Command {
            message: "Git signing is enabled but GPG agent is not responding".to_string(),
            hint: Some("try running without commit signing".to_string()),
        }
        .into(),
        _ => err,
    }
}
