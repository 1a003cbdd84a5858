use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::Service;

use super::*;
use crate::application::ApiKeyGateway;
use crate::config::GatewayConfig;
use crate::domain::country::CountryName;
use crate::domain::{
    ApiKeyRecord, ApiKeyRepository, Country, CountryDirectory, CountryLookupError, DomainError,
    DomainResult, NewApiKey,
};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::storage::InMemoryStorage;
use crate::interfaces::http::middleware::GatewayState;

/// Knows Peru; every other name is missing, "boom" fails upstream.
struct StubDirectory;

#[async_trait]
impl CountryDirectory for StubDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Vec<Country>, CountryLookupError> {
        match name {
            "peru" => Ok(vec![Country {
                name: CountryName {
                    common: "Peru".into(),
                    official: "Republic of Peru".into(),
                },
                capital: vec!["Lima".into()],
                ..Country::default()
            }]),
            "boom" => Err(CountryLookupError::Upstream("connection reset".into())),
            other => Err(CountryLookupError::NotFound(other.into())),
        }
    }
}

struct TestApp {
    router: Router,
    storage: InMemoryStorage,
}

fn app_with(uniform_denial_message: bool) -> TestApp {
    let storage = InMemoryStorage::new();
    let state = AppState::new(
        Arc::new(storage.clone()),
        Arc::new(StubDirectory),
        JwtConfig::new("http-test-secret", 1),
        &GatewayConfig {
            uniform_denial_message,
        },
        None,
    );
    TestApp {
        router: create_api_router(state),
        storage,
    }
}

fn app() -> TestApp {
    app_with(false)
}

impl TestApp {
    async fn call(&self, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut svc = self.router.clone().into_service();
        let resp = svc.call(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, body) = self.call(req).await;
        (status, body)
    }

    async fn country(&self, name: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(format!("/api/countries/name/{}", name));
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        let (status, _, body) = self.call(builder.body(Body::empty()).unwrap()).await;
        (status, body)
    }

    async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "s3cret-pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn issue(&self, token: &str, name: &str) -> (i32, String) {
        let (status, body) = self
            .send("POST", "/api/keys", Some(token), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["data"]["id"].as_i64().unwrap() as i32,
            body["data"]["key"].as_str().unwrap().to_string(),
        )
    }

    async fn usage_count(&self, secret: &str) -> i64 {
        self.storage.find_by_secret(secret).await.unwrap().unwrap().usage_count
    }

    /// The gateway's writes are detached from the response; wait for them.
    async fn wait_for_usage(&self, secret: &str, expected: i64) {
        for _ in 0..100 {
            if self.usage_count(secret).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("usage count never reached {}", expected);
    }
}

// ── Health / docs ──────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok_and_echoes_request_id() {
    let app = app();
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = app.call(req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "ok");
    assert_eq!(headers["x-request-id"], "trace-me");
}

#[tokio::test]
async fn request_id_is_generated_when_absent() {
    let app = app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (_, headers, _) = app.call(req).await;
    assert!(!headers["x-request-id"].is_empty());
}

#[tokio::test]
async fn openapi_document_lists_gateway_routes() {
    let app = app();
    let (status, body) = app.send("GET", "/api-doc/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/countries/name/{name}"].is_object());
    assert!(body["paths"]["/api/keys/{id}/toggle"].is_object());
}

#[tokio::test]
async fn metrics_without_recorder_is_unavailable() {
    let app = app();
    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, _, _) = app.call(req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Identity ───────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_profile() {
    let app = app();
    app.register("alice").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "s3cret-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.send("GET", "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn bad_credentials_and_duplicates_are_rejected() {
    let app = app();
    app.register("alice").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "nope"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"username": "alice", "email": "new@example.com", "password": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"username": "bob", "email": "not-an-email", "password": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_routes_require_a_valid_token() {
    let app = app();

    let (status, body) = app.send("GET", "/api/keys", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, body) = app.send("GET", "/api/keys", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

// ── Key management ─────────────────────────────────────────────

#[tokio::test]
async fn key_lifecycle() {
    let app = app();
    let token = app.register("alice").await;
    let (id, secret) = app.issue(&token, "travel blog").await;

    let (status, body) = app.send("GET", "/api/keys", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["key"], secret.as_str());
    assert_eq!(body["data"][0]["is_active"], true);

    let (status, body) = app
        .send("PATCH", &format!("/api/keys/{}/toggle", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);
    let masked = body["data"]["key"].as_str().unwrap();
    assert_eq!(masked, format!("{}...{}", &secret[..4], &secret[secret.len() - 4..]));

    let (_, body) = app
        .send("GET", "/api/keys/check-status", Some(&token), None)
        .await;
    assert_eq!(body["data"]["keysCount"], 1);
    assert_eq!(body["data"]["activeKeysCount"], 0);
    assert_eq!(body["data"]["keys"][0]["keyPreview"], format!("{}...", &secret[..8]));

    let (status, _) = app
        .send("DELETE", &format!("/api/keys/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send("GET", "/api/keys", Some(&token), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn issuing_without_a_name_is_rejected() {
    let app = app();
    let token = app.register("alice").await;
    let (status, _) = app
        .send("POST", "/api/keys", Some(&token), Some(json!({"name": ""})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/keys",
            Some(&token),
            Some(json!({"name": "k", "expiryDays": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expiry_days_sets_an_expiry() {
    let app = app();
    let token = app.register("alice").await;
    let (status, body) = app
        .send(
            "POST",
            "/api/keys",
            Some(&token),
            Some(json!({"name": "short lived", "expiryDays": 7})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = DateTime::parse_from_rfc3339(body["data"]["created_at"].as_str().unwrap()).unwrap();
    let expires = DateTime::parse_from_rfc3339(body["data"]["expires_at"].as_str().unwrap()).unwrap();
    assert_eq!(expires - created, chrono::Duration::days(7));
}

#[tokio::test]
async fn another_users_key_is_not_found() {
    let app = app();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let (id, _) = app.issue(&alice, "alice key").await;

    for (method, uri) in [
        ("PATCH", format!("/api/keys/{}/toggle", id)),
        ("DELETE", format!("/api/keys/{}", id)),
        ("GET", format!("/api/keys/{}/usage", id)),
    ] {
        let (status, body) = app.send(method, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["error"], "API key not found or not authorized");
    }
}

// ── Gateway ────────────────────────────────────────────────────

#[tokio::test]
async fn country_lookup_requires_an_api_key() {
    let app = app();

    let (status, body) = app.country("peru", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key is required");

    let (status, body) = app.country("peru", Some("nonexistent-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key - not found in database");
}

#[tokio::test]
async fn non_utf8_api_key_header_counts_as_missing() {
    let app = app();
    let token = app.register("alice").await;
    let (_, secret) = app.issue(&token, "blog").await;

    let req = Request::builder()
        .uri("/api/countries/name/peru")
        .header("x-api-key", HeaderValue::from_bytes(b"\xffkey\xfe").unwrap())
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.call(req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key is required");
    assert_eq!(app.usage_count(&secret).await, 0);
}

#[tokio::test]
async fn valid_key_gets_data_and_is_recorded() {
    let app = app();
    let token = app.register("alice").await;
    let (id, secret) = app.issue(&token, "blog").await;

    let (status, body) = app.country("peru", Some(&secret)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"]["common"], "Peru");
    assert_eq!(body["data"][0]["capital"][0], "Lima");
    assert_eq!(body["data"][0]["flags"]["alt"], "");

    app.wait_for_usage(&secret, 1).await;

    // The usage log append is a separate write; poll for it as well.
    let mut usage = Value::Null;
    for _ in 0..100 {
        let (_, body) = app
            .send("GET", &format!("/api/keys/{}/usage", id), Some(&token), None)
            .await;
        if body["data"]["usage"].as_array().map(Vec::len) == Some(1) {
            usage = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(usage["data"]["usage_count"], 1);
    assert_eq!(usage["data"]["usage"][0]["endpoint"], "/api/countries/name/peru");
    assert_eq!(usage["data"]["summary"][0]["count"], 1);

    let (_, logs) = app.send("GET", "/api/keys/logs", Some(&token), None).await;
    assert_eq!(logs["data"][0]["key_name"], "blog");
    assert_ne!(logs["data"][0]["key_value"], secret.as_str());
}

#[tokio::test]
async fn inactive_key_is_denied_and_not_counted() {
    let app = app();
    let token = app.register("alice").await;
    let (id, secret) = app.issue(&token, "blog").await;
    app.send("PATCH", &format!("/api/keys/{}/toggle", id), Some(&token), None)
        .await;

    let (status, body) = app.country("peru", Some(&secret)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key is inactive - please activate it first");
    assert_eq!(app.usage_count(&secret).await, 0);

    // Reactivation applies to the very next request.
    app.send("PATCH", &format!("/api/keys/{}/toggle", id), Some(&token), None)
        .await;
    let (status, _) = app.country("peru", Some(&secret)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_key_is_denied() {
    let app = app();
    let token = app.register("alice").await;
    let (_, body) = app.send("GET", "/api/auth/profile", Some(&token), None).await;
    let owner_id = body["data"]["id"].as_i64().unwrap() as i32;

    let expired = ApiKeyRepository::create(
        &app.storage,
        NewApiKey {
            owner_id,
            secret: "K3-expired-secret".into(),
            name: "old".into(),
            created_at: Utc::now(),
            expires_at: Some("2020-01-01T00:00:00Z".parse().unwrap()),
        },
    )
    .await
    .unwrap();

    let (status, body) = app.country("peru", Some(&expired.secret)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key is expired");
}

#[tokio::test]
async fn uniform_denial_message_hides_the_reason() {
    let app = app_with(true);
    let token = app.register("alice").await;
    let (id, secret) = app.issue(&token, "blog").await;
    app.send("PATCH", &format!("/api/keys/{}/toggle", id), Some(&token), None)
        .await;

    for key in [None, Some("nonexistent-key"), Some(secret.as_str())] {
        let (status, body) = app.country("peru", key).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key");
    }
}

#[tokio::test]
async fn upstream_errors_map_to_404_and_500() {
    let app = app();
    let token = app.register("alice").await;
    let (_, secret) = app.issue(&token, "blog").await;

    let (status, body) = app.country("atlantis", Some(&secret)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");

    let (status, body) = app.country("boom", Some(&secret)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error fetching country data");
}

/// Credential store that cannot be reached.
struct UnreachableStore;

#[async_trait]
impl ApiKeyRepository for UnreachableStore {
    async fn find_by_secret(&self, _secret: &str) -> DomainResult<Option<ApiKeyRecord>> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn touch_usage(&self, _id: i32, _at: DateTime<Utc>) -> DomainResult<()> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn create(&self, _key: NewApiKey) -> DomainResult<ApiKeyRecord> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn list_for_owner(&self, _owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn find_for_owner(&self, _id: i32, _owner_id: i32) -> DomainResult<Option<ApiKeyRecord>> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn set_active(&self, _id: i32, _is_active: bool) -> DomainResult<()> {
        Err(DomainError::Storage("connection refused".into()))
    }
    async fn delete(&self, _id: i32) -> DomainResult<()> {
        Err(DomainError::Storage("connection refused".into()))
    }
}

#[tokio::test]
async fn gateway_failure_is_an_internal_error() {
    let storage = InMemoryStorage::new();
    let mut state = AppState::new(
        Arc::new(storage.clone()),
        Arc::new(StubDirectory),
        JwtConfig::new("http-test-secret", 1),
        &GatewayConfig::default(),
        None,
    );
    state.gateway = GatewayState {
        gateway: ApiKeyGateway::new(Arc::new(UnreachableStore), Arc::new(storage)),
        uniform_denial_message: false,
    };
    let app = TestApp {
        router: create_api_router(state),
        storage: InMemoryStorage::new(),
    };

    let (status, body) = app.country("peru", Some("any-key")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}
