use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use super::{AuthDecision, Clock, DenialReason, GatewayError, SystemClock};
use crate::domain::{
    ApiKeyRecord, ApiKeyRepository, KeyState, RepositoryProvider, UsageLogRepository,
};

/// Validates inbound API keys against the credential store.
///
/// Every call reads the store; nothing is cached, so a toggle or delete
/// takes effect on the very next request.
#[derive(Clone)]
pub struct ApiKeyGateway {
    api_keys: Arc<dyn ApiKeyRepository>,
    usage_log: Arc<dyn UsageLogRepository>,
    clock: Arc<dyn Clock>,
}

/// Handles to the two best-effort writes dispatched after an `Authorized`
/// verdict. Dropping it detaches the writes; they still run.
pub struct Bookkeeping {
    touch: JoinHandle<()>,
    append: JoinHandle<()>,
}

impl Bookkeeping {
    /// Wait until both writes have finished, successfully or not.
    pub async fn settled(self) {
        let _ = self.touch.await;
        let _ = self.append.await;
    }
}

impl ApiKeyGateway {
    pub fn new(
        api_keys: Arc<dyn ApiKeyRepository>,
        usage_log: Arc<dyn UsageLogRepository>,
    ) -> Self {
        Self {
            api_keys,
            usage_log,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_provider(repos: &dyn RepositoryProvider) -> Self {
        Self::new(repos.api_keys(), repos.usage_log())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decide whether a request presenting `candidate` may reach `endpoint`.
    ///
    /// Denials are values, not errors. `Err` means no verdict could be reached
    /// (store unreachable or inconsistent). On `Authorized`, the usage counter
    /// update and the usage log append run in the background and cannot change
    /// the verdict.
    pub async fn authorize(
        &self,
        candidate: Option<&str>,
        endpoint: &str,
    ) -> Result<AuthDecision, GatewayError> {
        let (decision, _bookkeeping) = self.authorize_tracked(candidate, endpoint).await?;
        Ok(decision)
    }

    /// Same as [`authorize`](Self::authorize), but also returns the
    /// bookkeeping handle so callers can wait for the writes.
    pub async fn authorize_tracked(
        &self,
        candidate: Option<&str>,
        endpoint: &str,
    ) -> Result<(AuthDecision, Option<Bookkeeping>), GatewayError> {
        let now = self.clock.now();

        let decision = match self.evaluate(candidate, now).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(endpoint, error = %e, "API key authorization failed");
                metrics::counter!("api_key_authorizations_total", "outcome" => "error")
                    .increment(1);
                return Err(e);
            }
        };

        match &decision {
            AuthDecision::Authorized(record) => {
                debug!(key_id = record.id, endpoint, "API key authorized");
                metrics::counter!("api_key_authorizations_total", "outcome" => "authorized")
                    .increment(1);
                let bookkeeping = self.dispatch_bookkeeping(record, endpoint, now);
                Ok((decision, Some(bookkeeping)))
            }
            AuthDecision::Denied(reason) => {
                debug!(reason = reason.as_str(), endpoint, "API key denied");
                metrics::counter!("api_key_authorizations_total", "outcome" => reason.as_str())
                    .increment(1);
                Ok((decision, None))
            }
        }
    }

    async fn evaluate(
        &self,
        candidate: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthDecision, GatewayError> {
        let Some(secret) = candidate.filter(|s| !s.is_empty()) else {
            return Ok(AuthDecision::Denied(DenialReason::MissingCredential));
        };

        let Some(record) = self.api_keys.find_by_secret(secret).await? else {
            return Ok(AuthDecision::Denied(DenialReason::UnknownCredential));
        };

        Ok(match record.state_at(now) {
            KeyState::Active => AuthDecision::Authorized(record),
            KeyState::Inactive => AuthDecision::Denied(DenialReason::InactiveCredential),
            KeyState::Expired => AuthDecision::Denied(DenialReason::ExpiredCredential),
        })
    }

    fn dispatch_bookkeeping(
        &self,
        record: &ApiKeyRecord,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> Bookkeeping {
        let key_id = record.id;
        let span = tracing::Span::current();

        let api_keys = Arc::clone(&self.api_keys);
        let touch = tokio::spawn(
            async move {
                if let Err(e) = api_keys.touch_usage(key_id, now).await {
                    warn!(key_id, error = %e, "Failed to update API key usage counter");
                    metrics::counter!("api_key_bookkeeping_failures_total", "operation" => "touch_usage")
                        .increment(1);
                }
            }
            .instrument(span.clone()),
        );

        let usage_log = Arc::clone(&self.usage_log);
        let endpoint = endpoint.to_string();
        let append = tokio::spawn(
            async move {
                if let Err(e) = usage_log.append(key_id, &endpoint, now).await {
                    warn!(key_id, endpoint, error = %e, "Failed to append API key usage log");
                    metrics::counter!("api_key_bookkeeping_failures_total", "operation" => "append_usage")
                        .increment(1);
                }
            }
            .instrument(span),
        );

        Bookkeeping { touch, append }
    }
}
