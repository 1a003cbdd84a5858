//! Aggregate access point for all repositories.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ApiKeyRepository, DomainResult, UsageLogRepository, UserRepository};

/// Hands out the per-aggregate repositories that share one backing store.
///
/// Accessors return `Arc`s so callers can move them into spawned tasks.
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;
    fn api_keys(&self) -> Arc<dyn ApiKeyRepository>;
    fn usage_log(&self) -> Arc<dyn UsageLogRepository>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> DomainResult<()>;
}
