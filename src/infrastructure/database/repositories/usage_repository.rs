use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::db_err;
use crate::domain::usage::sort_endpoint_usage;
use crate::domain::{
    DomainResult, EndpointUsage, OwnerUsageEntry, UsageLogEntry, UsageLogRepository,
};
use crate::infrastructure::database::entities::{api_key, api_key_usage};

pub struct SeaOrmUsageLogRepository {
    db: DatabaseConnection,
}

impl SeaOrmUsageLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn usage_model_to_domain(model: api_key_usage::Model) -> UsageLogEntry {
    UsageLogEntry {
        id: model.id,
        api_key_id: model.api_key_id,
        endpoint: model.endpoint,
        timestamp: model.request_timestamp,
    }
}

#[async_trait]
impl UsageLogRepository for SeaOrmUsageLogRepository {
    async fn append(&self, api_key_id: i32, endpoint: &str, at: DateTime<Utc>) -> DomainResult<()> {
        let entry = api_key_usage::ActiveModel {
            api_key_id: Set(api_key_id),
            endpoint: Set(endpoint.to_string()),
            request_timestamp: Set(at),
            ..Default::default()
        };
        entry.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_for_key(&self, api_key_id: i32) -> DomainResult<Vec<UsageLogEntry>> {
        let models = api_key_usage::Entity::find()
            .filter(api_key_usage::Column::ApiKeyId.eq(api_key_id))
            .order_by_desc(api_key_usage::Column::RequestTimestamp)
            .order_by_desc(api_key_usage::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(usage_model_to_domain).collect())
    }

    async fn summary_for_key(&self, api_key_id: i32) -> DomainResult<Vec<EndpointUsage>> {
        let rows: Vec<(String, i64)> = api_key_usage::Entity::find()
            .select_only()
            .column(api_key_usage::Column::Endpoint)
            .column_as(Expr::col(api_key_usage::Column::Id).count(), "count")
            .filter(api_key_usage::Column::ApiKeyId.eq(api_key_id))
            .group_by(api_key_usage::Column::Endpoint)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut summary: Vec<EndpointUsage> = rows
            .into_iter()
            .map(|(endpoint, count)| EndpointUsage { endpoint, count })
            .collect();
        sort_endpoint_usage(&mut summary);
        Ok(summary)
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<OwnerUsageEntry>> {
        let keys: HashMap<i32, api_key::Model> = api_key::Entity::find()
            .filter(api_key::Column::UserId.eq(owner_id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|key| (key.id, key))
            .collect();

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let models = api_key_usage::Entity::find()
            .filter(api_key_usage::Column::ApiKeyId.is_in(keys.keys().copied()))
            .order_by_desc(api_key_usage::Column::RequestTimestamp)
            .order_by_desc(api_key_usage::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models
            .into_iter()
            .filter_map(|entry| {
                let key = keys.get(&entry.api_key_id)?;
                Some(OwnerUsageEntry {
                    id: entry.id,
                    api_key_id: entry.api_key_id,
                    key_name: key.name.clone(),
                    key_secret: key.secret.clone(),
                    endpoint: entry.endpoint,
                    timestamp: entry.request_timestamp,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::{ApiKeyRepository, NewApiKey, NewUser, UserRepository};
    use crate::infrastructure::database::repositories::{
        SeaOrmApiKeyRepository, SeaOrmUserRepository,
    };
    use crate::infrastructure::database::test_database;

    async fn seed_key(db: &DatabaseConnection, username: &str, secret: &str) -> (i32, i32) {
        let users = SeaOrmUserRepository::new(db.clone());
        let owner = match users.find_by_username(username).await.unwrap() {
            Some(user) => user,
            None => users
                .create(NewUser {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap(),
        };
        let key = SeaOrmApiKeyRepository::new(db.clone())
            .create(NewApiKey {
                owner_id: owner.id,
                secret: secret.to_string(),
                name: format!("{} key", secret),
                created_at: Utc::now(),
                expires_at: None,
            })
            .await
            .unwrap();
        (owner.id, key.id)
    }

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn entries_come_back_newest_first() {
        let db = test_database().await;
        let (_, key) = seed_key(&db, "alice", "k1").await;
        let repo = SeaOrmUsageLogRepository::new(db);

        repo.append(key, "/a", t(1)).await.unwrap();
        repo.append(key, "/b", t(3)).await.unwrap();
        repo.append(key, "/c", t(2)).await.unwrap();

        let endpoints: Vec<String> = repo
            .list_for_key(key)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.endpoint)
            .collect();
        assert_eq!(endpoints, vec!["/b", "/c", "/a"]);
    }

    #[tokio::test]
    async fn summary_counts_per_endpoint() {
        let db = test_database().await;
        let (_, key) = seed_key(&db, "alice", "k1").await;
        let repo = SeaOrmUsageLogRepository::new(db);

        for minute in 0..3 {
            repo.append(key, "/api/countries/name/peru", t(minute)).await.unwrap();
        }
        repo.append(key, "/api/countries/name/chile", t(10)).await.unwrap();

        let summary = repo.summary_for_key(key).await.unwrap();
        assert_eq!(
            summary,
            vec![
                EndpointUsage {
                    endpoint: "/api/countries/name/peru".to_string(),
                    count: 3
                },
                EndpointUsage {
                    endpoint: "/api/countries/name/chile".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn owner_log_joins_keys_and_excludes_other_users() {
        let db = test_database().await;
        let (alice, k1) = seed_key(&db, "alice", "alice-first").await;
        let (_, k2) = seed_key(&db, "alice", "alice-second").await;
        let (bob, k3) = seed_key(&db, "bob", "bob-only").await;
        let repo = SeaOrmUsageLogRepository::new(db);

        repo.append(k1, "/one", t(1)).await.unwrap();
        repo.append(k2, "/two", t(2)).await.unwrap();
        repo.append(k3, "/three", t(3)).await.unwrap();

        let log = repo.list_for_owner(alice).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].endpoint, "/two");
        assert_eq!(log[0].key_name, "alice-second key");
        assert_eq!(log[0].key_secret, "alice-second");
        assert_eq!(log[1].api_key_id, k1);

        assert_eq!(repo.list_for_owner(bob).await.unwrap().len(), 1);
        assert!(repo.list_for_owner(bob + 100).await.unwrap().is_empty());
        assert!(log[0].timestamp - log[1].timestamp == Duration::minutes(1));
    }
}
