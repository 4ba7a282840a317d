//! sqlpilot command-line entry point.

use anyhow::Context;
use sqlpilot::cli::Cli;
use sqlpilot::config::Config;
use sqlpilot::logging;
use sqlpilot::pipeline::Pipeline;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    info!(
        dialect = %config.default_dialect,
        postgres = %config.postgres.display_string(),
        "Configuration loaded"
    );

    let pipeline = Pipeline::from_config(&config, cli.mock_llm)?;
    let response = pipeline.handle(&cli.to_request()).await?;

    let json = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
    println!("{json}");
    Ok(())
}
