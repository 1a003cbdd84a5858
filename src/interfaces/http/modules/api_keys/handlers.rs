//! API key management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    ApiKeyResponse, CreateApiKeyRequest, KeyStatusResponse, KeyUsageResponse, UsageLogDto,
};
use crate::application::ApiKeyService;
use crate::domain::DomainError;
use crate::interfaces::http::common::{ApiError, ApiResponse, EmptyData, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct ApiKeyHandlerState {
    pub keys: ApiKeyService,
}

/// Another owner's key is reported exactly like a missing one.
fn key_error(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, "API key not found or not authorized")
        }
        other => ApiError::from(other),
    }
}

#[utoipa::path(
    get,
    path = "/api/keys",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's keys with full secrets", body = ApiResponse<Vec<ApiKeyResponse>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_api_keys(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<ApiKeyResponse>>>, ApiError> {
    let keys = state.keys.list(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        keys.into_iter().map(ApiKeyResponse::full).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/keys",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "Key issued; the full secret is included", body = ApiResponse<ApiKeyResponse>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_api_key(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ApiKeyResponse>>), ApiError> {
    let record = state
        .keys
        .issue(user.user_id, &request.name, request.expiry_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ApiKeyResponse::full(record))),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/keys/{id}",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Key and its usage history deleted", body = ApiResponse<EmptyData>),
        (status = 404, description = "API key not found or not authorized")
    )
)]
pub async fn delete_api_key(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EmptyData>>, ApiError> {
    state.keys.delete(user.user_id, id).await.map_err(key_error)?;
    Ok(Json(ApiResponse::success(EmptyData {})))
}

#[utoipa::path(
    patch,
    path = "/api/keys/{id}/toggle",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Updated key with masked secret", body = ApiResponse<ApiKeyResponse>),
        (status = 404, description = "API key not found or not authorized")
    )
)]
pub async fn toggle_api_key(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let record = state.keys.toggle(user.user_id, id).await.map_err(key_error)?;
    Ok(Json(ApiResponse::success(ApiKeyResponse::masked(record))))
}

#[utoipa::path(
    get,
    path = "/api/keys/{id}/usage",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Usage history and per-endpoint summary", body = ApiResponse<KeyUsageResponse>),
        (status = 404, description = "API key not found or not authorized")
    )
)]
pub async fn api_key_usage(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<KeyUsageResponse>>, ApiError> {
    let report = state.keys.usage(user.user_id, id).await.map_err(key_error)?;
    Ok(Json(ApiResponse::success(KeyUsageResponse::from(report))))
}

#[utoipa::path(
    get,
    path = "/api/keys/logs",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Usage log across all of the caller's keys, newest first", body = ApiResponse<Vec<UsageLogDto>>)
    )
)]
pub async fn api_key_logs(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<UsageLogDto>>>, ApiError> {
    let logs = state.keys.logs(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        logs.into_iter().map(UsageLogDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/keys/check-status",
    tag = "API Keys",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Key counts and secret previews", body = ApiResponse<KeyStatusResponse>)
    )
)]
pub async fn check_key_status(
    State(state): State<ApiKeyHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<KeyStatusResponse>>, ApiError> {
    let report = state.keys.status(user.user_id).await?;
    Ok(Json(ApiResponse::success(KeyStatusResponse::from(report))))
}
