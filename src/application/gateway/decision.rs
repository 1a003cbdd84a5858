use thiserror::Error;

use crate::domain::{ApiKeyRecord, DomainError};

/// Why a candidate key was refused. Always reported to the client as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No key was presented, or it was empty.
    MissingCredential,
    /// No key with this secret was ever issued (or it has been deleted).
    UnknownCredential,
    /// The owner deactivated the key.
    InactiveCredential,
    /// The key's expiry lies in the past.
    ExpiredCredential,
}

impl DenialReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::MissingCredential => "API key is required",
            DenialReason::UnknownCredential => "Invalid API key - not found in database",
            DenialReason::InactiveCredential => "API key is inactive - please activate it first",
            DenialReason::ExpiredCredential => "API key is expired",
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MissingCredential => "missing",
            DenialReason::UnknownCredential => "unknown",
            DenialReason::InactiveCredential => "inactive",
            DenialReason::ExpiredCredential => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized(ApiKeyRecord),
    Denied(DenialReason),
}

impl AuthDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthDecision::Authorized(_))
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AuthDecision::Denied(reason) => Some(*reason),
            AuthDecision::Authorized(_) => None,
        }
    }
}

/// The gateway could not reach a verdict. Reported to the client as 500.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("credential lookup failed: {0}")]
    Store(DomainError),

    #[error("credential store is inconsistent: {0}")]
    Inconsistent(String),
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Inconsistent(msg) => GatewayError::Inconsistent(msg),
            other => GatewayError::Store(other),
        }
    }
}
