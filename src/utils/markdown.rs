//! Markdown output through `mdcat`, falling back to plain text.

use std::io::ErrorKind;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

async fn pipe_to_mdcat(content: &str) -> Result<()> {
    let mut child = Command::new("mdcat")
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .await
            .context("Failed to write to mdcat")?;
    }

    let status = child.wait().await.context("Failed to wait for mdcat")?;
    if !status.success() {
        anyhow::bail!("mdcat exited with {status}");
    }
    Ok(())
}

/// Renders `content` with `mdcat`; prints it verbatim when `mdcat` is
/// missing or fails.
pub async fn print_markdown(content: &str) {
    match pipe_to_mdcat(content).await {
        Ok(()) => {}
        Err(e)
            if e.downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == ErrorKind::NotFound) =>
        {
            debug!("mdcat not installed, printing plain text");
            println!("{content}");
        }
        Err(e) => {
            warn!("mdcat failed: {e:#}");
            eprintln!("Warning: mdcat failed, falling back to plain text");
            println!("{content}");
        }
    }
}
