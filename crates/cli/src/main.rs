//! snap - snapshot blob store client
//!
//! Command-line access to snapshot blobs kept in S3-compatible buckets.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use snapstore_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;
    tracing::debug!(code = %exit_code, retryable = exit_code.is_retryable(), "snap finished");
    std::process::exit(exit_code.as_i32());
}
