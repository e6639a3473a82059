use std::process;

use aic::cli::render_error;
use aic::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so they never mix with command output. `RUST_LOG` is
/// honoured unless `--debug` asks for aic's debug output.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,aic=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = cli.config();
    init_tracing(config.as_ref().map_or(cli.global.debug, |config| config.debug));

    let result = match config {
        Ok(config) => cli.execute(&config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{}", render_error(&e));
        process::exit(1);
    }
}
