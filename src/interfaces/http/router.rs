//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{ApiKeyGateway, ApiKeyService, UserService};
use crate::config::GatewayConfig;
use crate::domain::{CountryDirectory, RepositoryProvider};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::{ApiResponse, EmptyData};
use crate::interfaces::http::middleware::{
    api_key_middleware, auth_middleware, AuthState, GatewayState, API_KEY_HEADER,
};
use crate::interfaces::http::modules::{
    api_keys, auth, countries, health,
    metrics::{http_metrics_middleware, prometheus_metrics, MetricsState},
    request_id::request_id_middleware,
};

/// Unified router state. Each handler extracts its own slice via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub gateway: GatewayState,
    pub auth_handlers: auth::AuthHandlerState,
    pub api_keys: api_keys::ApiKeyHandlerState,
    pub countries: countries::CountryHandlerState,
    pub health: health::HealthState,
    pub metrics: MetricsState,
}

impl AppState {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        directory: Arc<dyn CountryDirectory>,
        jwt_config: JwtConfig,
        gateway_config: &GatewayConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            auth: AuthState {
                jwt_config: jwt_config.clone(),
            },
            gateway: GatewayState {
                gateway: ApiKeyGateway::from_provider(repos.as_ref()),
                uniform_denial_message: gateway_config.uniform_denial_message,
            },
            auth_handlers: auth::AuthHandlerState {
                users: Arc::new(UserService::new(repos.users(), jwt_config)),
            },
            api_keys: api_keys::ApiKeyHandlerState {
                keys: ApiKeyService::from_provider(repos.as_ref()),
            },
            countries: countries::CountryHandlerState { directory },
            health: health::HealthState {
                repos,
                started_at: Instant::now(),
            },
            metrics: MetricsState { handle: metrics },
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        s.auth.clone()
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(s: &AppState) -> Self {
        s.gateway.clone()
    }
}

impl FromRef<AppState> for auth::AuthHandlerState {
    fn from_ref(s: &AppState) -> Self {
        s.auth_handlers.clone()
    }
}

impl FromRef<AppState> for api_keys::ApiKeyHandlerState {
    fn from_ref(s: &AppState) -> Self {
        s.api_keys.clone()
    }
}

impl FromRef<AppState> for countries::CountryHandlerState {
    fn from_ref(s: &AppState) -> Self {
        s.countries.clone()
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        s.health.clone()
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(s: &AppState) -> Self {
        s.metrics.clone()
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT from /api/auth/login or /api/auth/register"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::profile,
        // API Keys
        api_keys::list_api_keys,
        api_keys::create_api_key,
        api_keys::delete_api_key,
        api_keys::toggle_api_key,
        api_keys::api_key_usage,
        api_keys::api_key_logs,
        api_keys::check_key_status,
        // Countries
        countries::get_country_by_name,
    ),
    components(
        schemas(
            ApiResponse<String>,
            EmptyData,
            health::HealthResponse,
            health::ComponentHealth,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::TokenResponse,
            auth::UserInfo,
            api_keys::CreateApiKeyRequest,
            api_keys::ApiKeyResponse,
            api_keys::KeyUsageResponse,
            api_keys::UsageEntryDto,
            api_keys::EndpointUsageDto,
            api_keys::UsageLogDto,
            api_keys::KeyStatusResponse,
            api_keys::KeyStatusDto,
            countries::CountryListResponse,
            countries::CountryDto,
            countries::CountryNameDto,
            countries::CurrencyDto,
            countries::FlagsDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check"),
        (name = "Authentication", description = "Registration, login (JWT) and profile"),
        (name = "API Keys", description = "Issue, toggle, delete and audit API keys"),
        (name = "Countries", description = "Country data, authorized by the x-api-key header"),
    ),
    info(
        title = "Countries API",
        version = "1.0.0",
        description = "Country data behind per-user API keys with usage tracking",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the full application router.
pub fn create_api_router(state: AppState) -> Router {
    // Public
    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    // JWT protected
    let owner_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route(
            "/api/keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api/keys/logs", get(api_keys::api_key_logs))
        .route("/api/keys/check-status", get(api_keys::check_key_status))
        .route("/api/keys/{id}", delete(api_keys::delete_api_key))
        .route("/api/keys/{id}/toggle", patch(api_keys::toggle_api_key))
        .route("/api/keys/{id}/usage", get(api_keys::api_key_usage))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    // API key protected
    let country_routes = Router::new()
        .route(
            "/api/countries/name/{name}",
            get(countries::get_country_by_name),
        )
        .route_layer(middleware::from_fn_with_state(
            state.gateway.clone(),
            api_key_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(prometheus_metrics))
        .merge(auth_routes)
        .merge(owner_routes)
        .merge(country_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}
