//! # aic
//!
//! AI explanations of git history and AI-drafted commit messages.
//!
//! Commits and diffs are read with the git binary, turned into prompts and
//! sent to one of several backends (OpenAI, Claude, Groq, Ollama, Phind)
//! through a single [`ai::AiProvider`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use aic::ai::AiProvider;
//! use aic::config::{AiConfig, ConfigArgs};
//! use aic::git::{GitDiff, GitEntity, GitRepository};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AiConfig::resolve(ConfigArgs::default())?;
//! let provider = AiProvider::new(&config)?;
//! let repo = GitRepository::open()?;
//! let diff = GitEntity::Diff(GitDiff::load(&repo, true).await?);
//! println!("{}", provider.draft(&diff, None).await?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod utils;

pub use crate::cli::Cli;
pub use crate::error::AicError;

/// The current version of aic.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
