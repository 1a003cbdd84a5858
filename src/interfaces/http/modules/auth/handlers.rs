//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{LoginRequest, RegisterRequest, TokenResponse, UserInfo};
use crate::application::UserService;
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct AuthHandlerState {
    pub users: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and logged in", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    let result = state
        .users
        .register(&request.username, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TokenResponse::from(result))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let result = state.users.login(&request.username, &request.password).await?;
    Ok(Json(ApiResponse::success(TokenResponse::from(result))))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn profile(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let profile = state.users.profile(user.user_id).await?;
    Ok(Json(ApiResponse::success(UserInfo::from(profile))))
}
