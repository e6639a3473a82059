use std::collections::VecDeque;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use aic::ai::prompts::Prompt;
use aic::ai::provider::ProviderKind;
use aic::ai::{AiClient, AiClientMetadata, AiProvider, RetryPolicy};
use aic::cli::batch::run_batch;
use aic::cli::categorize::render_groups;
use aic::git::{FileStatus, GitCommit, GitDiff, GitEntity, GitRepository};
use aic::AicError;
use anyhow::Result;
use git2::{Repository, Signature};
use tempfile::TempDir;

/// Test setup that creates a temporary git repository
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
    commits: Vec<git2::Oid>,
}

impl TestRepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().to_path_buf();

        let repo = Repository::init(&repo_path)?;

        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        Ok(Self {
            _temp_dir: temp_dir,
            repo_path,
            repo,
            commits: Vec::new(),
        })
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        fs::write(self.repo_path.join(name), content)?;
        Ok(())
    }

    fn add_commit(&mut self, message: &str, files: &[(&str, &str)]) -> Result<git2::Oid> {
        let mut index = self.repo.index()?;
        for (name, content) in files {
            self.write(name, content)?;
            index.add_path(Path::new(name))?;
        }
        index.write()?;

        let signature = Signature::now("Test User", "test@example.com")?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent_commit = match self.commits.last() {
            Some(last_commit_id) => Some(self.repo.find_commit(*last_commit_id)?),
            None => None,
        };
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let commit_id =
            self.repo
                .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        self.commits.push(commit_id);
        Ok(commit_id)
    }

    /// Deletes a tracked file and stages the deletion, like `git rm`.
    fn remove_staged(&self, name: &str) -> Result<()> {
        fs::remove_file(self.repo_path.join(name))?;
        let mut index = self.repo.index()?;
        index.remove_path(Path::new(name))?;
        index.write()?;
        Ok(())
    }

    fn git(&self) -> Result<GitRepository> {
        GitRepository::open_at(&self.repo_path)
    }
}

/// AI client that replays canned responses and records every prompt.
#[derive(Clone)]
struct ScriptedClient {
    kind: ProviderKind,
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ScriptedClient {
    fn new(responses: &[&str]) -> Self {
        Self {
            kind: ProviderKind::Ollama,
            responses: Arc::new(Mutex::new(
                responses.iter().map(|r| (*r).to_string()).collect(),
            )),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn provider(&self) -> AiProvider {
        AiProvider::from_client(Box::new(self.clone()))
    }

    fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl AiClient for ScriptedClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        _stream: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no more scripted responses"))
        })
    }

    fn metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: self.kind,
            model: "scripted".to_string(),
        }
    }
}

fn aic_error(err: &anyhow::Error) -> &AicError {
    aic::error::find_aic_error(err).expect("expected an AicError")
}

#[tokio::test]
async fn explain_commit_sends_message_and_diff() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.py", "x=0\n")])?;
    let oid = test_repo.add_commit("fix: null check", &[("a.py", "x=1\n")])?;

    let git = test_repo.git()?;
    let short = &oid.to_string()[..7];
    let commit = GitCommit::load(&git, short).await?;
    assert_eq!(commit.hash(), oid.to_string());
    assert_eq!(commit.message(), "fix: null check");
    assert_eq!(commit.author(), "Test User");

    let entity = GitEntity::Commit(commit);
    let header = entity.header();
    assert!(header.starts_with("# Entity: Commit\n"));
    assert!(header.contains(&format!("`commit {oid}` | Test User <test@example.com> | ")));
    assert!(header.ends_with("fix: null check\n-----\n"));

    let client = ScriptedClient::new(&["Flips x from 0 to 1."]);
    let explanation = client.provider().explain(&entity, None, true).await?;
    assert_eq!(explanation, "Flips x from 0 to 1.");

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user().contains("fix: null check"));
    assert!(prompts[0].user().contains("+x=1"));
    assert!(prompts[0].user().contains("-x=0"));
    Ok(())
}

#[tokio::test]
async fn explain_root_commit() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let oid = test_repo.add_commit("feat: first", &[("main.rs", "fn main() {}\n")])?;

    let commit = GitCommit::load(&test_repo.git()?, &oid.to_string()).await?;
    assert!(commit.diff().await?.contains("+fn main() {}"));
    Ok(())
}

#[tokio::test]
async fn unknown_commit_is_not_found() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    let git = test_repo.git()?;

    for sha in ["deadbeef", "--all", "HEAD^{tree}"] {
        let err = GitCommit::load(&git, sha).await.unwrap_err();
        assert!(
            matches!(aic_error(&err), AicError::CommitNotFound(s) if s == sha),
            "{sha}: {err}"
        );
        assert_eq!(err.to_string(), format!("Commit '{sha}' not found"));
    }
    Ok(())
}

#[tokio::test]
async fn draft_with_nothing_staged_makes_no_request() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    test_repo.write("a.txt", "changed\n")?;
    let git = test_repo.git()?;
    let client = ScriptedClient::new(&["feat: unused"]);

    let err = GitDiff::load(&git, true).await.unwrap_err();
    assert_eq!(err.to_string(), "diff (staged) is empty");

    // The unstaged change is still visible.
    let working = GitDiff::load(&git, false).await?;
    assert!(working.text().contains("+changed"));

    assert_eq!(client.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn draft_rejects_commits_without_request() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    let oid = test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    let commit = GitCommit::load(&test_repo.git()?, &oid.to_string()).await?;
    let client = ScriptedClient::new(&["feat: unused"]);

    let err = client
        .provider()
        .draft(&GitEntity::Commit(commit), None)
        .await
        .unwrap_err();
    assert!(matches!(aic_error(&err), AicError::Usage(_)));
    assert_eq!(client.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn categorize_renders_suggested_groups() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.ts", "let a = 1;\n"), ("README.md", "# hi\n")])?;
    test_repo.write("a.ts", "let a = 2;\n")?;
    test_repo.write("README.md", "# hello\n")?;

    let git = test_repo.git()?;
    let changes = git.changed_files(false).await?;
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.status == FileStatus::Modified));

    let client = ScriptedClient::new(&[r#"```json
[
  {"category": "core-services", "files": [{"path": "a.ts", "status": "modified"}]},
  {"category": "documentation", "files": [{"path": "b.md", "status": "added"}]}
]
```"#]);
    let groups = client
        .provider()
        .categorize_groups(&changes, RetryPolicy::default())
        .await?;

    let rendered = render_groups(&groups);
    assert!(rendered.starts_with("Suggested file categorization:\n"));
    assert!(rendered.contains("\ncore-services:\n  • a.ts\n"));
    assert!(rendered.contains("\ndocumentation:\n  + b.md\n"));

    let sent = &client.prompts()[0];
    assert!(sent.user().contains(r#""path": "a.ts""#));
    Ok(())
}

#[tokio::test]
async fn batch_commits_each_group_once() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    test_repo.write("a.txt", "a2\n")?;
    test_repo.write("b.txt", "b\n")?;
    test_repo.write("c.txt", "c\n")?;

    let client = ScriptedClient::new(&[
        r#"[
          {"category": "docs", "files": [{"path": "a.txt", "status": "modified"}, {"path": "b.txt", "status": "added"}]},
          {"category": "again", "files": [{"path": "b.txt", "status": "added"}]},
          {"category": "rest", "files": [{"path": "b.txt", "status": "added"}, {"path": "c.txt", "status": "added"}]}
        ]"#,
        "**docs**: update a and add b\n\nextra explanation",
        "feat: add c",
    ]);
    let git = test_repo.git()?;

    let summary = run_batch(&client.provider(), &git, RetryPolicy::default()).await?;

    assert_eq!(summary.skipped, vec!["again".to_string()]);
    assert_eq!(summary.commits.len(), 2);
    assert_eq!(summary.commits[0].message, "docs: update a and add b");
    assert_eq!(summary.commits[0].files, vec!["a.txt", "b.txt"]);
    assert_eq!(summary.commits[1].files, vec!["c.txt"]);

    // One categorize request plus one draft per committed group.
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].user().starts_with("Intent context: Category: docs\nFiles: a.txt, b.txt"));
    assert!(prompts[2].user().starts_with("Intent context: Category: rest\nFiles: c.txt"));
    assert!(prompts[2].user().contains("+c"));
    assert!(!prompts[2].user().contains("b.txt"));

    let log = git.run(&["log", "--format=%s"]).await?;
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        vec!["feat: add c", "docs: update a and add b", "chore: init"]
    );
    let head_files = git.run(&["show", "--name-only", "--format=", "HEAD"]).await?;
    assert_eq!(head_files.trim(), "c.txt");
    assert!(git.uncommitted_changes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn batch_stops_at_first_failure_and_keeps_earlier_commits() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    test_repo.write("a.txt", "a2\n")?;
    test_repo.write("b.txt", "b\n")?;

    // No draft is scripted for the second group.
    let client = ScriptedClient::new(&[
        r#"[
          {"category": "one", "files": [{"path": "a.txt", "status": "modified"}]},
          {"category": "two", "files": [{"path": "b.txt", "status": "added"}]}
        ]"#,
        "fix: update a",
    ]);
    let git = test_repo.git()?;

    let result = run_batch(&client.provider(), &git, RetryPolicy::default()).await;
    assert!(result.is_err());

    let log = git.run(&["log", "--format=%s"]).await?;
    assert_eq!(log.lines().next(), Some("fix: update a"));
    Ok(())
}

#[tokio::test]
async fn batch_commits_non_ascii_paths() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("a.txt", "a\n")])?;
    test_repo.write("café.txt", "crème\n")?;
    let git = test_repo.git()?;

    let changes = git.uncommitted_changes().await?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "café.txt");

    let client = ScriptedClient::new(&[
        r#"[{"category": "docs", "files": [{"path": "café.txt", "status": "added"}]}]"#,
        "docs: add cafe notes",
    ]);
    let summary = run_batch(&client.provider(), &git, RetryPolicy::default()).await?;

    assert_eq!(summary.commits.len(), 1);
    assert_eq!(summary.commits[0].files, vec!["café.txt"]);
    let head_files = git.run(&["show", "--name-only", "--format=", "HEAD"]).await?;
    assert_eq!(head_files.trim(), "café.txt");
    assert!(git.uncommitted_changes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn categorize_lists_non_ascii_paths() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("résumé.md", "v1\n")])?;
    test_repo.write("résumé.md", "v2\n")?;

    let changes = test_repo.git()?.changed_files(false).await?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "résumé.md");
    assert_eq!(changes[0].status, FileStatus::Modified);
    Ok(())
}

#[tokio::test]
async fn batch_commits_already_staged_deletion() -> Result<()> {
    let mut test_repo = TestRepo::new()?;
    test_repo.add_commit("chore: init", &[("gone.txt", "bye\n"), ("keep.txt", "hi\n")])?;
    test_repo.remove_staged("gone.txt")?;
    let git = test_repo.git()?;

    let changes = git.uncommitted_changes().await?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].status, FileStatus::Deleted);
    assert!(changes[0].index_only);

    let client = ScriptedClient::new(&[
        r#"[{"category": "cleanup", "files": [{"path": "gone.txt", "status": "deleted"}]}]"#,
        "chore: remove gone.txt",
    ]);
    let summary = run_batch(&client.provider(), &git, RetryPolicy::default()).await?;

    assert_eq!(summary.commits.len(), 1);
    assert_eq!(summary.commits[0].files, vec!["gone.txt"]);
    assert!(client.prompts()[1].user().contains("-bye"));

    let head = git.run(&["show", "--name-status", "--format=%s", "HEAD"]).await?;
    assert!(head.starts_with("chore: remove gone.txt\n"));
    assert!(head.contains("D\tgone.txt"));
    assert!(git.uncommitted_changes().await?.is_empty());
    Ok(())
}
