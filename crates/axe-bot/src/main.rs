//! Axe order slicer - Entry Point
//!
//! Works a parent order over time as TWAP slices or POV bursts against
//! the in-process paper venue, persisting progress between runs.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Axe order slicer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via AXE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    axe_telemetry::init_logging()?;

    info!("Starting axe-bot v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > AXE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("AXE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    // Load configuration from specified file
    let config = axe_bot::AppConfig::from_file(&config_path)?;
    info!(?config.mode, symbol = %config.symbol, "Configuration loaded");

    // Create and run the application
    let app = axe_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
