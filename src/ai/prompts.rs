//! Prompt templates for explaining changes, drafting commit messages and
//! grouping changed files.

use anyhow::{Context, Result};

use crate::error::AicError;
use crate::git::FileChange;

/// Conventional commit types offered to the model when drafting.
pub const CONVENTIONAL_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

const EXPLAIN_SYSTEM_PROMPT: &str = "You are a helpful assistant that explains Git changes in a concise way. \
Focus only on the most significant changes and their direct impact. \
When answering specific questions, address them directly and precisely. \
Keep explanations brief but informative and don't ask for further explanations. \
Use markdown for clarity.";

const DRAFT_SYSTEM_PROMPT: &str = "You are a git commit message generator. Your task is to generate a SINGLE conventional commit message.
Rules:
1. Generate ONLY ONE commit message
2. Use present tense
3. Follow format: <type>(<optional scope>): <description>
4. Keep under 72 characters
5. NO explanations, NO comments, NO additional text
6. If multiple changes are present, choose the most significant one
7. Your entire response should be just one line of text
8. NO markdown formatting (no **, __, #, etc.)
9. NO special characters except those in the format
10. Output raw text only";

const CATEGORIZE_SYSTEM_PROMPT: &str = r#"You are a code change categorizer. Your ONLY task is to output a JSON array grouping related files.
Rules:
1. Output ONLY the JSON array, nothing else
2. NO explanations
3. NO markdown
4. NO comments
5. NO backticks
6. NO json keyword
7. Response MUST start with [ and end with ]
8. Use "category" NOT "purpose"
9. Each file must have path and status
10. NO additional text or formatting
11. Files array must contain full objects
12. NO shorthand array syntax
13. Use specific categories like:
    - "api-endpoints" for API-related files
    - "ai-providers" for AI provider implementations
    - "core-services" for main service files
    - "type-definitions" for type files
    - "project-config" for configuration files
    - "documentation" for docs and README
    - "database-services" for DB-related files
    - "utilities" for helper functions
14. Group files by their specific functionality"#;

const CATEGORIZE_FORMAT_EXAMPLE: &str = r#"RESPOND ONLY WITH A JSON ARRAY IN THIS EXACT FORMAT:
[
  {
    "category": "documentation",
    "files": [
      {"path": "README.md", "status": "modified"}
    ]
  },
  {
    "category": "project-config",
    "files": [
      {"path": "Cargo.toml", "status": "modified"},
      {"path": ".env.example", "status": "modified"}
    ]
  }
]

IMPORTANT:
1. Use "category" NOT "purpose"
2. Each file must be a full object with path and status
3. NO backticks, NO json keyword
4. NO shorthand array syntax like ["file1", "file2"]
5. Output raw JSON only
6. Use specific categories based on functionality
7. Separate services, providers, APIs, and configurations
8. Every file must be in exactly one category
9. Every file must have both path and status properties"#;

/// System and user instructions for a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    system: String,
    user: String,
}

impl Prompt {
    /// Creates a prompt from its two parts.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Returns the system instructions.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Returns the user instructions.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Joins both parts for backends that accept a single prompt string.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// The text of a git entity that prompts are built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityView<'a> {
    /// A commit: its message and diff.
    Commit {
        /// Full commit message.
        message: &'a str,
        /// Patch produced for the commit.
        diff: &'a str,
    },
    /// Working-tree or staged changes.
    Diff {
        /// Whether the diff is of the index.
        staged: bool,
        /// Patch text.
        diff: &'a str,
    },
}

/// Builds the prompt that explains a commit or diff.
///
/// With a query the model answers it; otherwise it summarizes the core
/// changes and their direct impact.
pub fn explain(view: &EntityView<'_>, query: Option<&str>) -> Prompt {
    let base = match view {
        EntityView::Commit { message, diff } => {
            format!("Context - Commit:\n\nMessage: {message}\nChanges:\n```diff\n{diff}\n```")
        }
        EntityView::Diff { diff, .. } => format!("Context - Changes:\n\n```diff\n{diff}\n```"),
    };

    let user = match query {
        Some(query) => format!(
            "{base}\n\nQuestion: {query}\nProvide a focused answer to the question based on the changes shown above."
        ),
        None => format!(
            "{base}\n\nProvide a short explanation covering:\n1. Core changes made\n2. Direct impact"
        ),
    };

    Prompt::new(EXPLAIN_SYSTEM_PROMPT, user)
}

/// Builds the prompt that drafts a single-line conventional commit message.
///
/// Only diffs can be drafted for; a commit yields a usage error.
pub fn draft(view: &EntityView<'_>, context: Option<&str>) -> Result<Prompt> {
    let EntityView::Diff { diff, .. } = view else {
        return Err(AicError::Usage("`draft` is only supported for diffs".to_string()).into());
    };

    let intent = context
        .map(|context| format!("Intent context: {context}\n"))
        .unwrap_or_default();
    let types = CONVENTIONAL_TYPES.join(", ");

    let user = format!(
        "{intent}
Generate a SINGLE commit message for the following changes:

```diff
{diff}
```

Available types: {types}

Remember:
- Output ONLY ONE commit message
- Format: <type>(<optional scope>): <description>
- 72 characters maximum
- If multiple changes, focus on the most significant one
- NO markdown formatting (no **, __, #, etc.)
- NO special characters except those in the format
- Output raw text only
- Your entire response should be a single line"
    );

    Ok(Prompt::new(DRAFT_SYSTEM_PROMPT, user))
}

/// Builds the prompt that asks for a JSON grouping of changed files.
pub fn categorize(changes: &[FileChange]) -> Result<Prompt> {
    let files =
        serde_json::to_string_pretty(changes).context("Failed to serialize changed files")?;
    let user = format!(
        "Categorize these files into specific logical groups:\n{files}\n\n{CATEGORIZE_FORMAT_EXAMPLE}"
    );
    Ok(Prompt::new(CATEGORIZE_SYSTEM_PROMPT, user))
}
