//! # Countries API gateway
//!
//! Country data served behind per-user API keys, with key management and
//! usage tracking.
//!
//! ## Architecture
//!
//! - **domain**: entities and the storage / upstream traits
//! - **application**: the API key gateway, identity and key management use-cases
//! - **infrastructure**: SQLite (SeaORM), in-memory storage, crypto, restcountries client
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle shared by the binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use application::{ApiKeyGateway, AuthDecision, DenialReason, GatewayError};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
