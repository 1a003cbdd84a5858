//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

pub const JWT_ISSUER: &str = "countries-gateway";

#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token lifetime in hours
    pub expiration_hours: i64,
    /// Issuer claim, checked on verification
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
            issuer: JWT_ISSUER.to_string(),
        }
    }
}

impl From<&SecurityConfig> for JwtConfig {
    fn from(security: &SecurityConfig) -> Self {
        Self::new(security.jwt_secret.clone(), security.jwt_expiration_hours)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl TokenClaims {
    pub fn new(user_id: i32, username: &str, email: &str, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours);

        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    /// Numeric user id carried in `sub`, if well formed.
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

pub fn create_token(
    user_id: i32,
    username: &str,
    email: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = TokenClaims::new(user_id, username, email, config);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature, expiry and issuer, then return the claims.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}
