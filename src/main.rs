mod api_client;
mod config;
mod error;
mod models;
mod normalize;
mod output;
mod pipeline;
mod render;

use crate::{config::Config, error::AppError, output::WriteOutcome};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Log level when `RUST_LOG` is unset.
const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env file is normal in CI.
    let _ = dotenvy::dotenv();
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::load()?;
    info!(
        username = %config.username,
        theme = %config.theme,
        authenticated = config.credentials.is_some(),
        "generating stats card"
    );

    let summary = pipeline::run(&config).await?;
    let changed = [summary.svg, summary.metadata].contains(&WriteOutcome::Written);
    info!(
        total_solved = summary.record.total_solved(),
        svg = ?summary.svg,
        metadata = ?summary.metadata,
        changed,
        "done"
    );
    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
