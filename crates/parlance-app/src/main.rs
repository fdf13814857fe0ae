//! Parlance binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Register the demo skill
//! 3. Run the start sequence (optional catalog sync)
//! 4. Serve the webhook with axum

mod cli;
mod demo;
mod startup;

use clap::Parser;
use parlance_api::state::AppState;
use parlance_core::ParlanceConfig;
use parlance_dialog::Assistant;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();
    let mut config = ParlanceConfig::load_or_default(&config_file);
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Parlance v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let mut assistant = Assistant::from_config(&config);
    demo::register(&mut assistant)?;

    let status = startup::start(&mut assistant, &config).await;
    tracing::info!(status = %status, "Start sequence finished");

    let state = AppState::new(assistant, config.server.webhook_token.clone());
    parlance_api::start_server(&config.server, state).await?;

    Ok(())
}
