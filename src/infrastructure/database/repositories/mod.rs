//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod api_key_repository;
pub mod repository_provider;
pub mod usage_repository;
pub mod user_repository;

pub use api_key_repository::SeaOrmApiKeyRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use usage_repository::SeaOrmUsageLogRepository;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}
