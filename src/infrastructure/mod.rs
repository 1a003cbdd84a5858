//! Infrastructure layer: persistence, crypto and outbound HTTP.

pub mod countries;
pub mod crypto;
pub mod database;
pub mod storage;

pub use countries::RestCountriesClient;
pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use storage::InMemoryStorage;
