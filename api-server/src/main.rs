// Atlas knowledge-agent server
// Main entry point for the atlas-server binary

use clap::Parser;
use std::path::PathBuf;

use api_server::AppState;
use atlas_engine::config::Config;
use atlas_engine::telemetry::{init_telemetry, init_telemetry_with_level};

/// Atlas — a knowledge-answering agent service
#[derive(Parser)]
#[command(name = "atlas-server", version, about)]
struct Cli {
    /// Path to a configuration file (defaults to ~/.atlas/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Atlas server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_create()?,
    };

    // Re-initialize telemetry with config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    init_telemetry_with_level(&config.core.log_level);

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config)?;
    api_server::serve(&config, state).await
}
