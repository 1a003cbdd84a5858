use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ApiKeyRecord, NewApiKey};
use crate::domain::DomainResult;

/// Credential store for issued API keys.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Exact match on the secret. More than one match is reported as
    /// `DomainError::Inconsistent`.
    async fn find_by_secret(&self, secret: &str) -> DomainResult<Option<ApiKeyRecord>>;

    /// Set `last_used_at = at` and add one to `usage_count` in a single
    /// atomic statement.
    async fn touch_usage(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()>;

    async fn create(&self, key: NewApiKey) -> DomainResult<ApiKeyRecord>;
    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>>;
    async fn find_for_owner(&self, id: i32, owner_id: i32) -> DomainResult<Option<ApiKeyRecord>>;
    async fn set_active(&self, id: i32, is_active: bool) -> DomainResult<()>;

    /// Removes the key together with its usage log entries.
    async fn delete(&self, id: i32) -> DomainResult<()>;
}
