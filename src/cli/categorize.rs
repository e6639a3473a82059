//! Categorize command: prints the backend's suggested grouping of changed
//! files.

use anyhow::Result;
use clap::Parser;

use crate::ai::{AiProvider, ChangeGroup, RetryPolicy};
use crate::error::AicError;
use crate::utils::{check_git_repository, Spinner};

/// Categorize command options.
#[derive(Parser, Debug)]
pub struct CategorizeCommand {
    /// Categorize staged changes instead of working-tree changes.
    #[arg(short, long)]
    pub staged: bool,
}

impl CategorizeCommand {
    /// Executes the categorize command.
    pub async fn execute(self, provider: &AiProvider) -> Result<()> {
        let repo = check_git_repository()?;
        let spinner = Spinner::start("Analyzing changes");

        let result = async {
            let changes = repo.changed_files(self.staged).await?;
            if changes.is_empty() {
                return Err(AicError::Usage(format!(
                    "No {}changes to categorize",
                    if self.staged { "staged " } else { "" }
                ))
                .into());
            }

            spinner.set_message("Categorizing changes");
            provider
                .categorize_groups(&changes, RetryPolicy::default())
                .await
        }
        .await;

        match result {
            Ok(groups) => {
                spinner.succeed("Changes categorized");
                print!("\n{}", render_groups(&groups));
                Ok(())
            }
            Err(e) => {
                spinner.fail("Failed to categorize changes");
                Err(e)
            }
        }
    }
}

/// Formats groups as an indented list with a status glyph per file.
pub fn render_groups(groups: &[ChangeGroup]) -> String {
    let mut out = String::from("Suggested file categorization:\n");
    for group in groups {
        out.push_str(&format!("\n{}:\n", group.category));
        for file in &group.files {
            out.push_str(&format!("  {}{}\n", file.status.glyph(), file.path));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{FileChange, FileStatus};

    #[test]
    fn renders_glyphs_per_status() {
        let groups = vec![
            ChangeGroup {
                category: "documentation".to_string(),
                files: vec![FileChange::new("b.md", FileStatus::Added)],
            },
            ChangeGroup {
                category: "core-services".to_string(),
                files: vec![
                    FileChange::new("a.ts", FileStatus::Modified),
                    FileChange::new("old.ts", FileStatus::Deleted),
                    FileChange::new("new.ts", FileStatus::Renamed),
                ],
            },
        ];

        insta::assert_snapshot!(render_groups(&groups), @r"
        Suggested file categorization:

        documentation:
          + b.md

        core-services:
          • a.ts
          - old.ts
          ~ new.ts
        ");
    }

    #[test]
    fn renders_header_only_for_no_groups() {
        assert_eq!(render_groups(&[]), "Suggested file categorization:\n");
    }
}
