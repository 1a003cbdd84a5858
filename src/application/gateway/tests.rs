use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::domain::{
    ApiKeyRecord, ApiKeyRepository, DomainError, DomainResult, EndpointUsage, NewApiKey, NewUser,
    OwnerUsageEntry, UsageLogEntry, UsageLogRepository, UserRepository,
};
use crate::infrastructure::storage::InMemoryStorage;

const ENDPOINT: &str = "/api/countries/name/france";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

struct Fixture {
    storage: InMemoryStorage,
    gateway: ApiKeyGateway,
    owner_id: i32,
}

impl Fixture {
    async fn new() -> Self {
        let storage = InMemoryStorage::new();
        let owner = UserRepository::create(
            &storage,
            NewUser {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();
        let gateway = ApiKeyGateway::new(Arc::new(storage.clone()), Arc::new(storage.clone()))
            .with_clock(Arc::new(FixedClock(now())));
        Self {
            storage,
            gateway,
            owner_id: owner.id,
        }
    }

    async fn key(&self, secret: &str, active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKeyRecord {
        let record = ApiKeyRepository::create(
            &self.storage,
            NewApiKey {
                owner_id: self.owner_id,
                secret: secret.to_string(),
                name: secret.to_string(),
                created_at: now() - Duration::days(60),
                expires_at,
            },
        )
        .await
        .unwrap();
        if !active {
            self.storage.set_active(record.id, false).await.unwrap();
        }
        self.reload(secret).await
    }

    async fn reload(&self, secret: &str) -> ApiKeyRecord {
        self.storage.find_by_secret(secret).await.unwrap().unwrap()
    }

    async fn log_len(&self, key_id: i32) -> usize {
        self.storage.list_for_key(key_id).await.unwrap().len()
    }

    async fn authorize_settled(&self, candidate: Option<&str>) -> AuthDecision {
        let (decision, bookkeeping) = self
            .gateway
            .authorize_tracked(candidate, ENDPOINT)
            .await
            .unwrap();
        if let Some(bookkeeping) = bookkeeping {
            bookkeeping.settled().await;
        }
        decision
    }
}

#[tokio::test]
async fn missing_or_empty_key_is_denied() {
    let fx = Fixture::new().await;
    let k1 = fx.key("K1", true, None).await;

    assert_eq!(
        fx.authorize_settled(None).await,
        AuthDecision::Denied(DenialReason::MissingCredential)
    );
    assert_eq!(
        fx.authorize_settled(Some("")).await,
        AuthDecision::Denied(DenialReason::MissingCredential)
    );

    assert_eq!(fx.reload("K1").await, k1);
    assert_eq!(fx.log_len(k1.id).await, 0);
}

#[tokio::test]
async fn unknown_key_is_denied() {
    let fx = Fixture::new().await;
    fx.key("K1", true, None).await;

    let decision = fx.authorize_settled(Some("nonexistent-key")).await;
    assert_eq!(decision, AuthDecision::Denied(DenialReason::UnknownCredential));
}

#[tokio::test]
async fn active_key_is_authorized_and_recorded() {
    let fx = Fixture::new().await;
    let k1 = fx.key("K1", true, None).await;
    assert_eq!(k1.usage_count, 0);

    let decision = fx.authorize_settled(Some("K1")).await;
    match decision {
        AuthDecision::Authorized(record) => assert_eq!(record.id, k1.id),
        other => panic!("expected authorization, got {:?}", other),
    }

    let after = fx.reload("K1").await;
    assert_eq!(after.usage_count, 1);
    assert_eq!(after.last_used_at, Some(now()));

    let log = fx.storage.list_for_key(k1.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].endpoint, ENDPOINT);
    assert_eq!(log[0].timestamp, now());
}

#[tokio::test]
async fn inactive_key_is_denied_without_side_effects() {
    let fx = Fixture::new().await;
    let k2 = fx.key("K2", false, None).await;

    let decision = fx.authorize_settled(Some("K2")).await;
    assert_eq!(decision, AuthDecision::Denied(DenialReason::InactiveCredential));

    let after = fx.reload("K2").await;
    assert_eq!(after.usage_count, 0);
    assert!(after.last_used_at.is_none());
    assert_eq!(fx.log_len(k2.id).await, 0);
}

#[tokio::test]
async fn expired_key_is_denied() {
    let fx = Fixture::new().await;
    let expiry = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let k3 = fx.key("K3", true, Some(expiry)).await;

    let decision = fx.authorize_settled(Some("K3")).await;
    assert_eq!(decision, AuthDecision::Denied(DenialReason::ExpiredCredential));
    assert_eq!(fx.reload("K3").await.usage_count, 0);
    assert_eq!(fx.log_len(k3.id).await, 0);
}

#[tokio::test]
async fn expiry_exactly_now_is_still_valid() {
    let fx = Fixture::new().await;
    fx.key("edge", true, Some(now())).await;
    fx.key("future", true, Some(now() + Duration::seconds(1))).await;
    fx.key("past", true, Some(now() - Duration::seconds(1))).await;

    assert!(fx.authorize_settled(Some("edge")).await.is_authorized());
    assert!(fx.authorize_settled(Some("future")).await.is_authorized());
    assert_eq!(
        fx.authorize_settled(Some("past")).await.denial_reason(),
        Some(DenialReason::ExpiredCredential)
    );
}

#[tokio::test]
async fn inactive_wins_over_expired() {
    let fx = Fixture::new().await;
    let expiry = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    fx.key("both", false, Some(expiry)).await;

    assert_eq!(
        fx.authorize_settled(Some("both")).await,
        AuthDecision::Denied(DenialReason::InactiveCredential)
    );
}

#[tokio::test]
async fn denials_are_idempotent() {
    let fx = Fixture::new().await;
    let k2 = fx.key("K2", false, None).await;

    for _ in 0..3 {
        assert_eq!(
            fx.authorize_settled(Some("nonexistent-key")).await,
            AuthDecision::Denied(DenialReason::UnknownCredential)
        );
        assert_eq!(
            fx.authorize_settled(Some("K2")).await,
            AuthDecision::Denied(DenialReason::InactiveCredential)
        );
    }
    assert_eq!(fx.reload("K2").await, k2);
}

#[tokio::test]
async fn state_changes_apply_to_the_next_call() {
    let fx = Fixture::new().await;
    let key = fx.key("toggled", true, None).await;

    assert!(fx.authorize_settled(Some("toggled")).await.is_authorized());

    fx.storage.set_active(key.id, false).await.unwrap();
    assert_eq!(
        fx.authorize_settled(Some("toggled")).await,
        AuthDecision::Denied(DenialReason::InactiveCredential)
    );

    ApiKeyRepository::delete(&fx.storage, key.id).await.unwrap();
    assert_eq!(
        fx.authorize_settled(Some("toggled")).await,
        AuthDecision::Denied(DenialReason::UnknownCredential)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_authorizations_count_every_use() {
    const N: usize = 64;
    let fx = Fixture::new().await;
    let key = fx.key("shared", true, None).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..N {
        let gateway = fx.gateway.clone();
        tasks.spawn(async move {
            let (decision, bookkeeping) = gateway
                .authorize_tracked(Some("shared"), ENDPOINT)
                .await
                .unwrap();
            if let Some(bookkeeping) = bookkeeping {
                bookkeeping.settled().await;
            }
            decision.is_authorized()
        });
    }

    let mut authorized = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap() {
            authorized += 1;
        }
    }

    assert_eq!(authorized, N);
    assert_eq!(fx.reload("shared").await.usage_count, N as i64);
    assert_eq!(fx.log_len(key.id).await, N);
}

#[tokio::test]
async fn plain_authorize_still_records_in_background() {
    let fx = Fixture::new().await;
    let key = fx.key("bg", true, None).await;

    assert!(fx.gateway.authorize(Some("bg"), ENDPOINT).await.unwrap().is_authorized());

    // The writes are detached; poll until they land.
    for _ in 0..100 {
        if fx.reload("bg").await.usage_count == 1 && fx.log_len(key.id).await == 1 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("background bookkeeping never completed");
}

// ── Failure injection ──────────────────────────────────────────

/// Wraps the in-memory store and fails selected operations.
struct FlakyStore {
    inner: InMemoryStorage,
    fail_lookup: AtomicBool,
    fail_touch: AtomicBool,
    fail_append: AtomicBool,
}

impl FlakyStore {
    fn new(inner: InMemoryStorage) -> Self {
        Self {
            inner,
            fail_lookup: AtomicBool::new(false),
            fail_touch: AtomicBool::new(false),
            fail_append: AtomicBool::new(false),
        }
    }

    fn check(flag: &AtomicBool) -> DomainResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DomainError::Storage("database is locked".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ApiKeyRepository for FlakyStore {
    async fn find_by_secret(&self, secret: &str) -> DomainResult<Option<ApiKeyRecord>> {
        Self::check(&self.fail_lookup)?;
        self.inner.find_by_secret(secret).await
    }

    async fn touch_usage(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        Self::check(&self.fail_touch)?;
        self.inner.touch_usage(id, at).await
    }

    async fn create(&self, key: NewApiKey) -> DomainResult<ApiKeyRecord> {
        ApiKeyRepository::create(&self.inner, key).await
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        ApiKeyRepository::list_for_owner(&self.inner, owner_id).await
    }

    async fn find_for_owner(&self, id: i32, owner_id: i32) -> DomainResult<Option<ApiKeyRecord>> {
        self.inner.find_for_owner(id, owner_id).await
    }

    async fn set_active(&self, id: i32, is_active: bool) -> DomainResult<()> {
        self.inner.set_active(id, is_active).await
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        ApiKeyRepository::delete(&self.inner, id).await
    }
}

#[async_trait]
impl UsageLogRepository for FlakyStore {
    async fn append(&self, api_key_id: i32, endpoint: &str, at: DateTime<Utc>) -> DomainResult<()> {
        Self::check(&self.fail_append)?;
        self.inner.append(api_key_id, endpoint, at).await
    }

    async fn list_for_key(&self, api_key_id: i32) -> DomainResult<Vec<UsageLogEntry>> {
        self.inner.list_for_key(api_key_id).await
    }

    async fn summary_for_key(&self, api_key_id: i32) -> DomainResult<Vec<EndpointUsage>> {
        self.inner.summary_for_key(api_key_id).await
    }

    async fn list_for_owner(&self, owner_id: i32) -> DomainResult<Vec<OwnerUsageEntry>> {
        UsageLogRepository::list_for_owner(&self.inner, owner_id).await
    }
}

async fn flaky_fixture() -> (Arc<FlakyStore>, ApiKeyGateway, ApiKeyRecord) {
    let fx = Fixture::new().await;
    let key = fx.key("K1", true, None).await;
    let store = Arc::new(FlakyStore::new(fx.storage.clone()));
    let gateway = ApiKeyGateway::new(store.clone(), store.clone())
        .with_clock(Arc::new(FixedClock(now())));
    (store, gateway, key)
}

#[tokio::test]
async fn bookkeeping_failures_do_not_change_the_verdict() {
    let (store, gateway, key) = flaky_fixture().await;
    store.fail_touch.store(true, Ordering::SeqCst);
    store.fail_append.store(true, Ordering::SeqCst);

    let (decision, bookkeeping) = gateway.authorize_tracked(Some("K1"), ENDPOINT).await.unwrap();
    assert!(decision.is_authorized());
    bookkeeping.expect("authorized calls dispatch bookkeeping").settled().await;

    let after = store.inner.find_by_secret("K1").await.unwrap().unwrap();
    assert_eq!(after.usage_count, 0);
    assert!(store.inner.list_for_key(key.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_failed_write_does_not_block_the_other() {
    let (store, gateway, key) = flaky_fixture().await;
    store.fail_touch.store(true, Ordering::SeqCst);

    let (decision, bookkeeping) = gateway.authorize_tracked(Some("K1"), ENDPOINT).await.unwrap();
    assert!(decision.is_authorized());
    bookkeeping.unwrap().settled().await;

    assert_eq!(store.inner.find_by_secret("K1").await.unwrap().unwrap().usage_count, 0);
    assert_eq!(store.inner.list_for_key(key.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn lookup_failure_is_an_internal_error() {
    let (store, gateway, key) = flaky_fixture().await;
    store.fail_lookup.store(true, Ordering::SeqCst);

    let err = gateway.authorize(Some("K1"), ENDPOINT).await.unwrap_err();
    assert!(matches!(err, GatewayError::Store(DomainError::Storage(_))));
    assert!(store.inner.list_for_key(key.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_key_never_reaches_the_store() {
    let (store, gateway, _) = flaky_fixture().await;
    store.fail_lookup.store(true, Ordering::SeqCst);

    let decision = gateway.authorize(None, ENDPOINT).await.unwrap();
    assert_eq!(decision, AuthDecision::Denied(DenialReason::MissingCredential));
}

/// Store that reports two records for one secret.
struct DuplicatedSecretStore;

#[async_trait]
impl ApiKeyRepository for DuplicatedSecretStore {
    async fn find_by_secret(&self, _secret: &str) -> DomainResult<Option<ApiKeyRecord>> {
        Err(DomainError::Inconsistent("2 records share a secret".to_string()))
    }
    async fn touch_usage(&self, _id: i32, _at: DateTime<Utc>) -> DomainResult<()> {
        unreachable!()
    }
    async fn create(&self, _key: NewApiKey) -> DomainResult<ApiKeyRecord> {
        unreachable!()
    }
    async fn list_for_owner(&self, _owner_id: i32) -> DomainResult<Vec<ApiKeyRecord>> {
        unreachable!()
    }
    async fn find_for_owner(&self, _id: i32, _owner_id: i32) -> DomainResult<Option<ApiKeyRecord>> {
        unreachable!()
    }
    async fn set_active(&self, _id: i32, _is_active: bool) -> DomainResult<()> {
        unreachable!()
    }
    async fn delete(&self, _id: i32) -> DomainResult<()> {
        unreachable!()
    }
}

#[tokio::test]
async fn duplicated_secret_is_an_inconsistency_error() {
    let gateway = ApiKeyGateway::new(Arc::new(DuplicatedSecretStore), Arc::new(InMemoryStorage::new()));
    let err = gateway.authorize(Some("dup"), ENDPOINT).await.unwrap_err();
    assert!(matches!(err, GatewayError::Inconsistent(_)));
}
