//! Countries API gateway CLI
//!
//! ```sh
//! # Default config (~/.config/countries-gateway/config.toml)
//! countries-gateway-cli
//!
//! # Custom config path and port
//! countries-gateway-cli --config /etc/countries-gateway/config.toml --port 8080
//!
//! # Throwaway instance with no database
//! countries-gateway-cli --ephemeral
//!
//! # Validate config without starting
//! countries-gateway-cli --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use countries_gateway::config::AppConfig;
use countries_gateway::server::{init_tracing, ServerHandle, ServerOptions};

/// Countries API: country data behind per-user API keys.
#[derive(Parser, Debug)]
#[command(
    name = "countries-gateway-cli",
    version,
    about = "Countries API with API key management and usage tracking",
    long_about = "REST API serving country data to holders of valid API keys.\n\n\
                  Default config: ~/.config/countries-gateway/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "COUNTRIES_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Keep users, keys and usage in memory; nothing survives a restart.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(countries_gateway::default_config_path);

    let mut config = match AppConfig::load_or_default(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Upstream    : {}", config.countries.base_url);
        println!("   Log level   : {}", config.logging.level);
        if config.uses_dev_secret() {
            println!("   Warning     : development JWT secret in use");
        }
        return ExitCode::SUCCESS;
    }

    init_tracing(&config);
    info!("Configuration: {}", config_path.display());

    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        ephemeral: cli.ephemeral,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    ExitCode::SUCCESS
}
