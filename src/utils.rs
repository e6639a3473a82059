//! Utility functions and helpers.

pub mod clipboard;
pub mod markdown;
pub mod preflight;
pub mod settings;
pub mod spinner;

pub use preflight::{check_batch_prerequisites, check_batch_provider, check_git_repository};
pub use settings::{get_env_var, Settings};
pub use spinner::Spinner;
