use std::sync::Arc;

use tracing::info;

use crate::application::gateway::{Clock, SystemClock};
use crate::domain::{
    ApiKeyRecord, ApiKeyRepository, DomainError, DomainResult, EndpointUsage, NewApiKey,
    OwnerUsageEntry, RepositoryProvider, UsageLogEntry, UsageLogRepository,
};
use crate::infrastructure::crypto::api_key::{
    expiry_after_days, generate_api_key_secret, MAX_EXPIRY_DAYS,
};

/// Usage statistics for a single key.
#[derive(Debug, Clone)]
pub struct KeyUsageReport {
    pub key: ApiKeyRecord,
    /// Newest first.
    pub entries: Vec<UsageLogEntry>,
    pub summary: Vec<EndpointUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
    pub key_preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatusReport {
    pub total: usize,
    pub active: usize,
    pub keys: Vec<KeyStatus>,
}

/// Key lifecycle operations, always scoped to the calling owner.
///
/// A key owned by someone else is reported exactly like a missing one.
#[derive(Clone)]
pub struct ApiKeyService {
    api_keys: Arc<dyn ApiKeyRepository>,
    usage_log: Arc<dyn UsageLogRepository>,
    clock: Arc<dyn Clock>,
}

impl ApiKeyService {
    pub fn new(
        api_keys: Arc<dyn ApiKeyRepository>,
        usage_log: Arc<dyn UsageLogRepository>,
    ) -> Self {
        Self {
            api_keys,
            usage_log,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_provider(repos: &dyn RepositoryProvider) -> Self {
        Self::new(repos.api_keys(), repos.usage_log())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a fresh, active key. The returned record carries the full secret.
    pub async fn issue(
        &self,
        owner_id: i32,
        name: &str,
        expiry_days: Option<i64>,
    ) -> DomainResult<ApiKeyRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("API key name is required".into()));
        }
        if let Some(days) = expiry_days {
            if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
                return Err(DomainError::Validation(format!(
                    "expiryDays must be between 1 and {}",
                    MAX_EXPIRY_DAYS
                )));
            }
        }

        let now = self.clock.now();
        let record = self
            .api_keys
            .create(NewApiKey {
                owner_id,
                secret: generate_api_key_secret(),
                name: name.to_string(),
                created_at: now,
                expires_at: expiry_days.map(|days| expiry_after_days(now, days)),
            })
            .await?;

        info!(owner_id, key_id = record.id, "API key issued");
        Ok(record)
    }

    pub async fn list(&self, owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        self.api_keys.list_for_owner(owner_id).await
    }

    /// Flip the active flag and return the updated record.
    pub async fn toggle(&self, owner_id: i32, id: i32) -> DomainResult<ApiKeyRecord> {
        let mut key = self.owned(owner_id, id).await?;
        key.is_active = !key.is_active;
        self.api_keys.set_active(id, key.is_active).await?;

        info!(owner_id, key_id = id, is_active = key.is_active, "API key toggled");
        Ok(key)
    }

    pub async fn delete(&self, owner_id: i32, id: i32) -> DomainResult<()> {
        self.owned(owner_id, id).await?;
        self.api_keys.delete(id).await?;

        info!(owner_id, key_id = id, "API key deleted");
        Ok(())
    }

    pub async fn usage(&self, owner_id: i32, id: i32) -> DomainResult<KeyUsageReport> {
        let key = self.owned(owner_id, id).await?;
        let entries = self.usage_log.list_for_key(id).await?;
        let summary = self.usage_log.summary_for_key(id).await?;
        Ok(KeyUsageReport {
            key,
            entries,
            summary,
        })
    }

    /// Every usage entry across the owner's keys, newest first.
    pub async fn logs(&self, owner_id: i32) -> DomainResult<Vec<OwnerUsageEntry>> {
        self.usage_log.list_for_owner(owner_id).await
    }

    pub async fn status(&self, owner_id: i32) -> DomainResult<KeyStatusReport> {
        let keys = self.api_keys.list_for_owner(owner_id).await?;
        let active = keys.iter().filter(|k| k.is_active).count();
        Ok(KeyStatusReport {
            total: keys.len(),
            active,
            keys: keys
                .iter()
                .map(|k| KeyStatus {
                    id: k.id,
                    name: k.name.clone(),
                    is_active: k.is_active,
                    key_preview: k.secret_preview(),
                })
                .collect(),
        })
    }

    async fn owned(&self, owner_id: i32, id: i32) -> DomainResult<ApiKeyRecord> {
        self.api_keys
            .find_for_owner(id, owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ApiKey", "id", id))
    }
}
