//! Mapping of application errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::{CountryLookupError, DomainError};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// An error ready to be rendered as an `ApiResponse` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity, .. } => {
                Self::new(StatusCode::NOT_FOUND, format!("{} not found", entity))
            }
            DomainError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            DomainError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            DomainError::Unauthorized(msg) => Self::unauthorized(msg),
            err @ (DomainError::Storage(_) | DomainError::Inconsistent(_)) => {
                error!(error = %err, "Request failed with an internal error");
                Self::internal()
            }
        }
    }
}

impl From<CountryLookupError> for ApiError {
    fn from(err: CountryLookupError) -> Self {
        match err {
            CountryLookupError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Country not found"),
            CountryLookupError::Upstream(detail) => {
                error!(error = %detail, "Country lookup failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error fetching country data",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}
