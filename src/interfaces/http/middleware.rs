//! Authentication middleware for Axum
//!
//! - `auth_middleware`: JWT bearer tokens, used by the account and key
//!   management routes.
//! - `api_key_middleware`: `x-api-key` header checked by the gateway, used
//!   by the country data routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use crate::application::{ApiKeyGateway, AuthDecision};
use crate::domain::ApiKeyRecord;
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};
use crate::interfaces::http::common::ApiResponse;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Message used for every denial when uniform denial messages are enabled.
pub const UNIFORM_DENIAL_MESSAGE: &str = "Invalid API key";

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

/// State for the JWT middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// The user behind a verified JWT, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
    pub email: String,
}

impl AuthenticatedUser {
    fn from_claims(claims: TokenClaims) -> Option<Self> {
        Some(Self {
            user_id: claims.user_id()?,
            username: claims.username,
            email: claims.email,
        })
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_token)
        .map(String::from);
    let Some(token) = token else {
        return auth_error_response(AuthError::MissingToken);
    };

    let user = verify_token(&token, &auth_state.jwt_config)
        .ok()
        .and_then(AuthenticatedUser::from_claims);
    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => auth_error_response(AuthError::InvalidToken),
    }
}

fn auth_error_response(error: AuthError) -> Response {
    let message = match error {
        AuthError::MissingToken => "No token provided",
        AuthError::InvalidToken => "Invalid token",
    };

    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

// ── API key gateway ────────────────────────────────────────────

/// State for the API key middleware
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: ApiKeyGateway,
    /// Answer every denial with the same message instead of the precise reason.
    pub uniform_denial_message: bool,
}

/// The key that authorized the current request, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct AuthorizedKey(pub ApiKeyRecord);

/// Gate a route behind the `x-api-key` header.
///
/// Denials answer 401, a gateway failure answers 500. The usage log records
/// the request path including its query string.
pub async fn api_key_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // A header value that is not visible ASCII counts as no key at all.
    let candidate = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let endpoint = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    match state.gateway.authorize(candidate.as_deref(), &endpoint).await {
        Ok(AuthDecision::Authorized(record)) => {
            request.extensions_mut().insert(AuthorizedKey(record));
            next.run(request).await
        }
        Ok(AuthDecision::Denied(reason)) => {
            debug!(reason = reason.as_str(), endpoint = %endpoint, "Rejected API key");
            let message = if state.uniform_denial_message {
                UNIFORM_DENIAL_MESSAGE
            } else {
                reason.message()
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(message)),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, endpoint = %endpoint, "API key check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Internal server error")),
            )
                .into_response()
        }
    }
}
