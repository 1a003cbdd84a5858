use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An issued API key as stored by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: i32,
    /// The user that issued the key.
    pub owner_id: i32,
    /// Opaque bearer token, globally unique and immutable once issued.
    pub secret: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the key never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Successful authorizations so far. Only ever incremented.
    pub usage_count: i64,
}

impl ApiKeyRecord {
    pub fn state_at(&self, now: DateTime<Utc>) -> KeyState {
        KeyState::evaluate(self.is_active, self.expires_at, now)
    }

    pub fn masked_secret(&self) -> String {
        mask_secret(&self.secret)
    }

    /// First eight characters of the secret, for status listings.
    pub fn secret_preview(&self) -> String {
        let head: String = self.secret.chars().take(8).collect();
        format!("{}...", head)
    }
}

/// Fields supplied when issuing a key; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub owner_id: i32,
    pub secret: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a key, derived on demand and never stored.
///
/// A deleted key has no state: its record is simply gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Active,
    Inactive,
    Expired,
}

impl KeyState {
    /// `Inactive` wins over `Expired`. A key whose expiry equals `now` is still active.
    pub fn evaluate(
        is_active: bool,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if !is_active {
            return KeyState::Inactive;
        }
        match expires_at {
            Some(expiry) if expiry < now => KeyState::Expired,
            _ => KeyState::Active,
        }
    }
}

/// `abcd...wxyz` form shown wherever the full secret must not be echoed.
/// Secrets shorter than 10 characters are returned unchanged.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 10 {
        return secret.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
