use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{EndpointUsage, OwnerUsageEntry, UsageLogEntry};
use crate::domain::DomainResult;

/// Append-only log of successful API key uses.
#[async_trait]
pub trait UsageLogRepository: Send + Sync {
    async fn append(&self, api_key_id: i32, endpoint: &str, at: DateTime<Utc>) -> DomainResult<()>;

    /// Newest first.
    async fn list_for_key(&self, api_key_id: i32) -> DomainResult<Vec<UsageLogEntry>>;

    /// Per-endpoint counts, busiest first.
    async fn summary_for_key(&self, api_key_id: i32) -> DomainResult<Vec<EndpointUsage>>;

    /// Every entry for every key the user owns, newest first.
    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<OwnerUsageEntry>>;
}
