//! Authentication DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::AuthResult;
use crate::domain::User;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "username": "traveller",
    "email": "traveller@example.com",
    "password": "correct horse"
}))]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

impl From<AuthResult> for TokenResponse {
    fn from(result: AuthResult) -> Self {
        Self {
            token: result.token,
            token_type: result.token_type,
            expires_in: result.expires_in,
            user: UserInfo::from(result.user),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}
