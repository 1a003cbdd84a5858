use async_trait::async_trait;

use super::{NewUser, User};
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DomainError::Conflict` when the username or email is taken.
    async fn create(&self, user: NewUser) -> DomainResult<User>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn exists_with_username_or_email(&self, username: &str, email: &str)
        -> DomainResult<bool>;
}
