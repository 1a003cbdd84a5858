//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/countries-gateway/config.toml`).
//! Every field has a default, so a partial file (or none at all) is valid.
//! `JWT_SECRET` and `DATABASE_URL` override the file when set.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("countries-gateway")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub countries: CountriesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SeaORM connection URL.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./countries_api.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `countries_gateway=debug,tower_http=info`.
    pub level: String,
    /// `plain` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Answer every API key denial with the same message.
    /// The precise reason is still logged.
    pub uniform_denial_message: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountriesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://restcountries.com/v3.1".to_string(),
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Read the TOML file at `path`, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    /// (still subject to environment overrides and validation).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "security.jwt_secret must not be empty".to_string(),
            ));
        }
        if self.security.jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid(
                "security.jwt_expiration_hours must be positive".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".to_string()));
        }
        match self.logging.format.to_lowercase().as_str() {
            "plain" | "json" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "logging.format must be 'plain' or 'json', got '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// True while the built-in development JWT secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.security.jwt_secret == DEV_JWT_SECRET
    }
}
