pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::SeaOrmRepositoryProvider;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseSection;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./countries_api.db?mode=rwc")
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::from(&DatabaseSection::default())
    }
}

impl From<&DatabaseSection> for DatabaseConfig {
    fn from(section: &DatabaseSection) -> Self {
        Self {
            url: section.url.clone(),
            max_connections: section.max_connections,
        }
    }
}

impl DatabaseConfig {
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            ..Self::default()
        }
    }
}

/// Open the connection pool.
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!("Connecting to database: {}", config.url);
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections.max(1))
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    info!("Database connected successfully");
    Ok(db)
}

/// Fresh migrated in-memory SQLite database for tests.
///
/// A single pooled connection keeps every query on the same in-memory file.
#[cfg(test)]
pub async fn test_database() -> DatabaseConnection {
    use sea_orm_migration::MigratorTrait;

    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migrator::Migrator::up(&db, None).await.unwrap();
    db
}
