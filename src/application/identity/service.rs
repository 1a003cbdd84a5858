//! User account use-cases
//!
//! HTTP handlers stay thin and delegate here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{DomainError, DomainResult, NewUser, User, UserRepository};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};

/// Returned by `login` and `register`.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    jwt_config: JwtConfig,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, jwt_config: JwtConfig) -> Self {
        Self { repo, jwt_config }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Authentication ──────────────────────────────────────────

    /// Check username + password and issue a JWT.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<AuthResult> {
        if username.is_empty() || password.is_empty() {
            return Err(DomainError::Validation(
                "Username and password are required".into(),
            ));
        }

        let Some(user) = self.repo.find_by_username(username).await? else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        let valid = match verify_password(password, &user.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
                false
            }
        };
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        info!(user_id = user.id, "User logged in");
        self.issue_token(user)
    }

    // ── Registration ────────────────────────────────────────────

    /// Create an account and log it in straight away.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<AuthResult> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(DomainError::Validation("All fields are required".into()));
        }

        if self.repo.exists_with_username_or_email(username, email).await? {
            return Err(DomainError::Conflict(
                "Username or email already exists".into(),
            ));
        }

        let password_hash = hash_password(password)
            .map_err(|e| DomainError::Storage(format!("Failed to hash password: {}", e)))?;

        // The store re-checks uniqueness, so a racing registration still
        // surfaces as Conflict.
        let user = self
            .repo
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "New user registered");
        self.issue_token(user)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn profile(&self, user_id: i32) -> DomainResult<User> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))
    }

    fn issue_token(&self, user: User) -> DomainResult<AuthResult> {
        let token = create_token(user.id, &user.username, &user.email, &self.jwt_config)
            .map_err(|e| DomainError::Storage(format!("Failed to create token: {}", e)))?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }
}
