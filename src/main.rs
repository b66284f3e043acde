mod cli;
mod engine;
mod model;
mod orchestrator;
mod report;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // The TUI owns the terminal; log lines would tear its frames.
    if !(cfg!(feature = "tui") && args.is_interactive()) {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    cli::run(args).await
}
