//! Charge server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `charge-config.yaml` (or `CHARGE_CONFIG`)
//! 3. Resolve the advertised network identity
//! 4. Start the dispatcher and, if enabled, the ambient ticker
//! 5. Serve HTTP + `WebSocket` until `Ctrl-C`

use std::path::PathBuf;

use charge_core::ChargeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "charge-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("charge-server starting");

    let path = std::env::var("CHARGE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = ChargeConfig::load_or_default(&path)?;
    info!(
        host = config.server.host,
        port = config.server.port,
        policy = ?config.progress.policy,
        ceiling = config.progress.ceiling,
        ambient = config.ambient.enabled,
        "Configuration loaded"
    );

    charge_server::run(config).await?;

    info!("charge-server exited cleanly");
    Ok(())
}
