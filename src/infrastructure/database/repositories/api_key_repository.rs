use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::db_err;
use crate::domain::{ApiKeyRecord, ApiKeyRepository, DomainError, DomainResult, NewApiKey};
use crate::infrastructure::database::entities::api_key;

pub struct SeaOrmApiKeyRepository {
    db: DatabaseConnection,
}

impl SeaOrmApiKeyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn api_key_model_to_domain(model: api_key::Model) -> ApiKeyRecord {
    ApiKeyRecord {
        id: model.id,
        owner_id: model.user_id,
        secret: model.secret,
        name: model.name,
        created_at: model.created_at,
        expires_at: model.expires_at,
        is_active: model.is_active,
        last_used_at: model.last_used_at,
        usage_count: model.usage_count,
    }
}

#[async_trait]
impl ApiKeyRepository for SeaOrmApiKeyRepository {
    async fn find_by_secret(&self, secret: &str) -> DomainResult<Option<ApiKeyRecord>> {
        // Fetch up to two rows so a broken uniqueness constraint is detectable.
        let mut models = api_key::Entity::find()
            .filter(api_key::Column::Secret.eq(secret))
            .limit(2)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        if models.len() > 1 {
            return Err(DomainError::Inconsistent(
                "more than one API key shares a secret".to_string(),
            ));
        }

        Ok(models.pop().map(api_key_model_to_domain))
    }

    async fn touch_usage(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        let result = api_key::Entity::update_many()
            .col_expr(
                api_key::Column::UsageCount,
                Expr::col(api_key::Column::UsageCount).add(1),
            )
            .col_expr(api_key::Column::LastUsedAt, Expr::value(at))
            .filter(api_key::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ApiKey", "id", id));
        }
        Ok(())
    }

    async fn create(&self, key: NewApiKey) -> DomainResult<ApiKeyRecord> {
        let model = api_key::ActiveModel {
            user_id: Set(key.owner_id),
            secret: Set(key.secret),
            name: Set(key.name),
            created_at: Set(key.created_at),
            expires_at: Set(key.expires_at),
            is_active: Set(true),
            last_used_at: Set(None),
            usage_count: Set(0),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        Ok(api_key_model_to_domain(inserted))
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        let models = api_key::Entity::find()
            .filter(api_key::Column::UserId.eq(owner_id))
            .order_by_desc(api_key::Column::CreatedAt)
            .order_by_desc(api_key::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(api_key_model_to_domain).collect())
    }

    async fn find_for_owner(&self, id: i32, owner_id: i32) -> DomainResult<Option<ApiKeyRecord>> {
        let model = api_key::Entity::find_by_id(id)
            .filter(api_key::Column::UserId.eq(owner_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(api_key_model_to_domain))
    }

    async fn set_active(&self, id: i32, is_active: bool) -> DomainResult<()> {
        let result = api_key::Entity::update_many()
            .col_expr(api_key::Column::IsActive, Expr::value(is_active))
            .filter(api_key::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ApiKey", "id", id));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = api_key::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ApiKey", "id", id));
        }
        Ok(())
    }
}
