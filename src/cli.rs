//! CLI interface for aic.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::ai::AiProvider;
use crate::config::{AiConfig, ConfigArgs};
use crate::error::find_aic_error;

pub mod batch;
pub mod categorize;
pub mod draft;
pub mod explain;
pub mod list;

/// aic: AI explanations of git history and AI-drafted commit messages.
#[derive(Parser)]
#[command(name = "aic")]
#[command(about = "AI-powered CLI tool for git commit summaries", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Backend selection shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted before or after any subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// AI provider to use: openai, claude, groq, ollama or phind [default: phind].
    #[arg(short, long, global = true, env = "AIC_AI_PROVIDER", value_name = "TYPE")]
    pub provider: Option<String>,

    /// API key for the provider.
    #[arg(short = 'k', long, global = true, env = "AIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model to use with the provider.
    #[arg(short, long, global = true, env = "AIC_MODEL")]
    pub model: Option<String>,

    /// Overrides the provider's API host.
    #[arg(long, global = true, env = "AIC_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Enables debug logging.
    #[arg(
        long,
        global = true,
        env = "AIC_DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub debug: bool,

    /// Maximum number of tokens to generate [default: 100].
    #[arg(long, global = true, value_name = "NUMBER")]
    pub max_tokens: Option<u32>,
}

impl From<&GlobalArgs> for ConfigArgs {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            provider: args.provider.clone(),
            api_key: args.api_key.clone(),
            model: args.model.clone(),
            base_url: args.base_url.clone(),
            max_tokens: args.max_tokens,
            debug: args.debug,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Explain the changes in a commit, or the current diff.
    Explain(explain::ExplainCommand),
    /// List all commits in an interactive fuzzy-finder, and summarize the changes.
    List(list::ListCommand),
    /// Generate a commit message for the staged changes.
    Draft(draft::DraftCommand),
    /// Group uncommitted changes and commit each group with a drafted message.
    Batch(batch::BatchCommand),
    /// Suggest how uncommitted changes could be split into commits.
    Categorize(categorize::CategorizeCommand),
}

impl Cli {
    /// Resolves the backend configuration from flags, environment and the
    /// settings file.
    pub fn config(&self) -> Result<AiConfig> {
        AiConfig::resolve(ConfigArgs::from(&self.global))
    }

    /// Executes the CLI command.
    pub async fn execute(self, config: &AiConfig) -> Result<()> {
        let provider = AiProvider::new(config)?;
        match self.command {
            Commands::Explain(cmd) => cmd.execute(&provider).await,
            Commands::List(cmd) => cmd.execute(&provider).await,
            Commands::Draft(cmd) => cmd.execute(&provider).await,
            Commands::Batch(cmd) => cmd.execute(&provider).await,
            Commands::Categorize(cmd) => cmd.execute(&provider).await,
        }
    }
}

/// Formats an error for stderr.
///
/// Errors raised by aic itself print their message; anything else is
/// reported as unexpected together with its cause chain.
pub fn render_error(err: &anyhow::Error) -> String {
    if let Some(aic) = find_aic_error(err) {
        return format!("Error: {aic}");
    }

    let mut rendered = format!("Unexpected error: {err}");
    for cause in err.chain().skip(1) {
        rendered.push_str(&format!("\n  Caused by: {cause}"));
    }
    rendered
}
