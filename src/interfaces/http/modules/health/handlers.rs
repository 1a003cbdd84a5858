//! Health check handler

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::domain::RepositoryProvider;

#[derive(Clone)]
pub struct HealthState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub started_at: Instant,
}

/// Service health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: ComponentHealth,
}

/// Component health status
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let db_start = Instant::now();
    let database = match state.repos.ping().await {
        Ok(()) => ComponentHealth {
            status: "ok".to_string(),
            latency_ms: Some(db_start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            ComponentHealth {
                status: "error".to_string(),
                latency_ms: None,
            }
        }
    };

    let (http_status, status) = if database.status == "ok" {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            database,
        }),
    )
}
