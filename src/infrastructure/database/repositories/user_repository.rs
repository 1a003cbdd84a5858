use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use super::db_err;
use crate::domain::{DomainError, DomainResult, NewUser, User, UserRepository};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        created_at: model.created_at,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, new_user: NewUser) -> DomainResult<User> {
        let model = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                DomainError::Conflict("User already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(user_model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn exists_with_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> DomainResult<bool> {
        let count = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .count(&self.db)
            .await
            .map_err(db_err)?;

        Ok(count > 0)
    }
}
