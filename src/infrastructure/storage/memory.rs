//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::usage::sort_endpoint_usage;
use crate::domain::{
    ApiKeyRecord, ApiKeyRepository, DomainError, DomainResult, EndpointUsage, NewApiKey, NewUser,
    OwnerUsageEntry, RepositoryProvider, UsageLogEntry, UsageLogRepository, User, UserRepository,
};

/// In-memory storage for development and testing.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<i32, User>,
    api_keys: DashMap<i32, ApiKeyRecord>,
    usage: DashMap<i32, UsageLogEntry>,
    user_seq: AtomicI32,
    api_key_seq: AtomicI32,
    usage_seq: AtomicI32,
    // Serializes writes that check a constraint first: unique inserts, and
    // usage appends against key deletes.
    write_guard: Mutex<()>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(seq: &AtomicI32) -> i32 {
        seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_writes(&self) -> DomainResult<std::sync::MutexGuard<'_, ()>> {
        self.inner
            .write_guard
            .lock()
            .map_err(|_| DomainError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let _guard = self.lock_writes()?;
        let taken = self
            .inner
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(DomainError::Conflict("User already exists".to_string()));
        }

        let created = User {
            id: Self::next_id(&self.inner.user_seq),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        self.inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        Ok(self.inner.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .inner
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn exists_with_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> DomainResult<bool> {
        Ok(self
            .inner
            .users
            .iter()
            .any(|u| u.username == username || u.email == email))
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryStorage {
    async fn find_by_secret(&self, secret: &str) -> DomainResult<Option<ApiKeyRecord>> {
        let mut matches: Vec<ApiKeyRecord> = self
            .inner
            .api_keys
            .iter()
            .filter(|k| k.secret == secret)
            .map(|k| k.clone())
            .collect();

        if matches.len() > 1 {
            return Err(DomainError::Inconsistent(
                "more than one API key shares a secret".to_string(),
            ));
        }
        Ok(matches.pop())
    }

    async fn touch_usage(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        // `get_mut` holds the shard write lock for the whole update.
        let mut key = self
            .inner
            .api_keys
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("ApiKey", "id", id))?;
        key.usage_count += 1;
        key.last_used_at = Some(at);
        Ok(())
    }

    async fn create(&self, key: NewApiKey) -> DomainResult<ApiKeyRecord> {
        let _guard = self.lock_writes()?;
        if self.inner.api_keys.iter().any(|k| k.secret == key.secret) {
            return Err(DomainError::Storage(
                "UNIQUE constraint failed: api_keys.secret".to_string(),
            ));
        }

        let record = ApiKeyRecord {
            id: Self::next_id(&self.inner.api_key_seq),
            owner_id: key.owner_id,
            secret: key.secret,
            name: key.name,
            created_at: key.created_at,
            expires_at: key.expires_at,
            is_active: true,
            last_used_at: None,
            usage_count: 0,
        };
        self.inner.api_keys.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        let mut keys: Vec<ApiKeyRecord> = self
            .inner
            .api_keys
            .iter()
            .filter(|k| k.owner_id == owner_id)
            .map(|k| k.clone())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(keys)
    }

    async fn find_for_owner(&self, id: i32, owner_id: i32) -> DomainResult<Option<ApiKeyRecord>> {
        Ok(self
            .inner
            .api_keys
            .get(&id)
            .filter(|k| k.owner_id == owner_id)
            .map(|k| k.clone()))
    }

    async fn set_active(&self, id: i32, is_active: bool) -> DomainResult<()> {
        let mut key = self
            .inner
            .api_keys
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("ApiKey", "id", id))?;
        key.is_active = is_active;
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let _guard = self.lock_writes()?;
        if self.inner.api_keys.remove(&id).is_none() {
            return Err(DomainError::not_found("ApiKey", "id", id));
        }
        self.inner.usage.retain(|_, entry| entry.api_key_id != id);
        Ok(())
    }
}

#[async_trait]
impl UsageLogRepository for InMemoryStorage {
    async fn append(&self, api_key_id: i32, endpoint: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let _guard = self.lock_writes()?;
        if !self.inner.api_keys.contains_key(&api_key_id) {
            return Err(DomainError::Storage(
                "FOREIGN KEY constraint failed: api_key_usage.api_key_id".to_string(),
            ));
        }
        let entry = UsageLogEntry {
            id: Self::next_id(&self.inner.usage_seq),
            api_key_id,
            endpoint: endpoint.to_string(),
            timestamp: at,
        };
        self.inner.usage.insert(entry.id, entry);
        Ok(())
    }

    async fn list_for_key(&self, api_key_id: i32) -> DomainResult<Vec<UsageLogEntry>> {
        let mut entries: Vec<UsageLogEntry> = self
            .inner
            .usage
            .iter()
            .filter(|e| e.api_key_id == api_key_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn summary_for_key(&self, api_key_id: i32) -> DomainResult<Vec<EndpointUsage>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for entry in self.inner.usage.iter().filter(|e| e.api_key_id == api_key_id) {
            *counts.entry(entry.endpoint.clone()).or_insert(0) += 1;
        }
        let mut summary: Vec<EndpointUsage> = counts
            .into_iter()
            .map(|(endpoint, count)| EndpointUsage { endpoint, count })
            .collect();
        sort_endpoint_usage(&mut summary);
        Ok(summary)
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<OwnerUsageEntry>> {
        let mut entries: Vec<OwnerUsageEntry> = self
            .inner
            .usage
            .iter()
            .filter_map(|entry| {
                let key = self.inner.api_keys.get(&entry.api_key_id)?;
                if key.owner_id != owner_id {
                    return None;
                }
                Some(OwnerUsageEntry {
                    id: entry.id,
                    api_key_id: entry.api_key_id,
                    key_name: key.name.clone(),
                    key_secret: key.secret.clone(),
                    endpoint: entry.endpoint.clone(),
                    timestamp: entry.timestamp,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(entries)
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryStorage {
    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(self.clone())
    }

    fn api_keys(&self) -> Arc<dyn ApiKeyRepository> {
        Arc::new(self.clone())
    }

    fn usage_log(&self) -> Arc<dyn UsageLogRepository> {
        Arc::new(self.clone())
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
