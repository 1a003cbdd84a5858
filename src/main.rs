//! Countries API gateway
//!
//! Reads configuration from `COUNTRIES_GATEWAY_CONFIG` or
//! `~/.config/countries-gateway/config.toml`; a missing file means defaults.
//! For command line options use the `countries-gateway-cli` binary.

use tracing::{error, info};

use countries_gateway::{default_config_path, init_tracing, AppConfig, ServerHandle, ServerOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("COUNTRIES_GATEWAY_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let config = match AppConfig::load_or_default(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration: {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };

    let handle = ServerHandle::start(ServerOptions {
        config,
        ..ServerOptions::default()
    })
    .await?;
    handle.install_signal_handler();

    info!("Press Ctrl+C to shut down gracefully.");
    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
