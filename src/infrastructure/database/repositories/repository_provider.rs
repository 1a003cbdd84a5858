//! SeaORM implementation of RepositoryProvider

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use super::{db_err, SeaOrmApiKeyRepository, SeaOrmUsageLogRepository, SeaOrmUserRepository};
use crate::domain::{
    ApiKeyRepository, DomainResult, RepositoryProvider, UsageLogRepository, UserRepository,
};

/// Repository provider backed by one SeaORM connection pool.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let key = repos.api_keys().find_by_secret(secret).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    users: Arc<SeaOrmUserRepository>,
    api_keys: Arc<SeaOrmApiKeyRepository>,
    usage_log: Arc<SeaOrmUsageLogRepository>,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(SeaOrmUserRepository::new(db.clone())),
            api_keys: Arc::new(SeaOrmApiKeyRepository::new(db.clone())),
            usage_log: Arc::new(SeaOrmUsageLogRepository::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn api_keys(&self) -> Arc<dyn ApiKeyRepository> {
        self.api_keys.clone()
    }

    fn usage_log(&self) -> Arc<dyn UsageLogRepository> {
        self.usage_log.clone()
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
