//! Resolution of the backend configuration from flags, environment and the
//! settings file.

use anyhow::{Context, Result};
use tracing::debug;

use crate::ai::ollama::DEFAULT_MAX_TOKENS;
use crate::ai::provider::ProviderKind;

/// Environment variable naming the backend.
pub const PROVIDER_ENV: &str = "AIC_AI_PROVIDER";
/// Environment variable carrying the API key.
pub const API_KEY_ENV: &str = "AIC_API_KEY";
/// Environment variable naming the model.
pub const MODEL_ENV: &str = "AIC_MODEL";
/// Environment variable overriding the backend host.
pub const BASE_URL_ENV: &str = "AIC_BASE_URL";
/// Environment variable enabling diagnostics.
pub const DEBUG_ENV: &str = "AIC_DEBUG";
/// Environment variable capping generated tokens.
pub const MAX_TOKENS_ENV: &str = "AIC_MAX_TOKENS";

/// Values given on the command line or picked up by clap from the
/// environment. `None` means not given.
#[derive(Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Backend name.
    pub provider: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Backend host override.
    pub base_url: Option<String>,
    /// Token cap for local models.
    pub max_tokens: Option<u32>,
    /// Diagnostics flag.
    pub debug: bool,
}

/// Resolved backend configuration, built once per process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiConfig {
    /// Selected backend.
    pub provider: ProviderKind,
    /// API key, if any source supplied one.
    pub api_key: Option<String>,
    /// Model name; backends fall back to their defaults when absent.
    pub model: Option<String>,
    /// Token cap passed to backends that accept one.
    pub max_tokens: u32,
    /// Backend host override.
    pub base_url: Option<String>,
    /// Whether diagnostics were requested.
    pub debug: bool,
}

/// Backend-specific variables consulted when no generic key is set.
fn provider_key_vars(provider: ProviderKind) -> &'static [&'static str] {
    match provider {
        ProviderKind::OpenAi => &["OPENAI_API_KEY"],
        ProviderKind::Claude => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
        ProviderKind::Groq => &["GROQ_API_KEY"],
        ProviderKind::Ollama | ProviderKind::Phind => &[],
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AiConfig {
    /// Resolves the configuration using the process environment and
    /// `~/.aic/settings.json`.
    pub fn resolve(args: ConfigArgs) -> Result<Self> {
        Self::from_sources(args, |key| crate::utils::settings::get_env_var(key).ok())
    }

    /// Resolves the configuration; `lookup` supplies values for anything
    /// not given in `args`.
    pub fn from_sources(args: ConfigArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let provider = match non_empty(args.provider).or_else(|| non_empty(lookup(PROVIDER_ENV))) {
            Some(name) => ProviderKind::parse(&name)?,
            None => ProviderKind::default(),
        };

        let api_key = non_empty(args.api_key)
            .or_else(|| non_empty(lookup(API_KEY_ENV)))
            .or_else(|| {
                provider_key_vars(provider)
                    .iter()
                    .find_map(|key| non_empty(lookup(key)))
            });

        let model = non_empty(args.model).or_else(|| non_empty(lookup(MODEL_ENV)));
        let base_url = non_empty(args.base_url).or_else(|| non_empty(lookup(BASE_URL_ENV)));

        let max_tokens = match args.max_tokens {
            Some(n) => n,
            None => match non_empty(lookup(MAX_TOKENS_ENV)) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {MAX_TOKENS_ENV} value: {raw}"))?,
                None => DEFAULT_MAX_TOKENS,
            },
        };

        let debug = args.debug || lookup(DEBUG_ENV).is_some_and(|v| truthy(&v));

        let config = Self {
            provider,
            api_key,
            model,
            max_tokens,
            base_url,
            debug,
        };
        debug!(
            provider = %config.provider,
            model = ?config.model,
            has_api_key = config.api_key.is_some(),
            max_tokens = config.max_tokens,
            "Resolved configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::error::AicError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_phind() {
        let config = AiConfig::from_sources(ConfigArgs::default(), lookup_from(&[])).unwrap();
        assert_eq!(config.provider, ProviderKind::Phind);
        assert_eq!(config.api_key, None);
        assert_eq!(config.max_tokens, 100);
        assert!(!config.debug);
    }

    #[test]
    fn flags_win_over_lookup() {
        let args = ConfigArgs {
            provider: Some("Claude".to_string()),
            api_key: Some("flag-key".to_string()),
            model: Some("flag-model".to_string()),
            ..ConfigArgs::default()
        };
        let lookup = lookup_from(&[
            (PROVIDER_ENV, "openai"),
            (API_KEY_ENV, "env-key"),
            (MODEL_ENV, "env-model"),
        ]);
        let config = AiConfig::from_sources(args, lookup).unwrap();
        assert_eq!(config.provider, ProviderKind::Claude);
        assert_eq!(config.api_key.as_deref(), Some("flag-key"));
        assert_eq!(config.model.as_deref(), Some("flag-model"));
    }

    #[test]
    fn provider_specific_key_fallback() {
        let lookup = lookup_from(&[(PROVIDER_ENV, "claude"), ("CLAUDE_API_KEY", "sk-ant")]);
        let config = AiConfig::from_sources(ConfigArgs::default(), lookup).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));

        // Keys of other backends are not borrowed.
        let lookup = lookup_from(&[(PROVIDER_ENV, "groq"), ("OPENAI_API_KEY", "sk")]);
        let config = AiConfig::from_sources(ConfigArgs::default(), lookup).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let args = ConfigArgs {
            provider: Some("bard".to_string()),
            ..ConfigArgs::default()
        };
        let err = AiConfig::from_sources(args, lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AicError>(),
            Some(AicError::UnknownProvider(name)) if name == "bard"
        ));
    }

    #[test]
    fn max_tokens_and_debug_from_lookup() {
        let lookup = lookup_from(&[(MAX_TOKENS_ENV, "256"), (DEBUG_ENV, "true")]);
        let config = AiConfig::from_sources(ConfigArgs::default(), lookup).unwrap();
        assert_eq!(config.max_tokens, 256);
        assert!(config.debug);

        let lookup = lookup_from(&[(MAX_TOKENS_ENV, "lots")]);
        assert!(AiConfig::from_sources(ConfigArgs::default(), lookup).is_err());
    }

    #[test]
    fn blank_values_are_ignored() {
        let args = ConfigArgs {
            model: Some(String::new()),
            ..ConfigArgs::default()
        };
        let lookup = lookup_from(&[(MODEL_ENV, "llama3"), (API_KEY_ENV, "  ")]);
        let config = AiConfig::from_sources(args, lookup).unwrap();
        assert_eq!(config.model.as_deref(), Some("llama3"));
        assert_eq!(config.api_key, None);
    }
}
