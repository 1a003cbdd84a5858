//! API key secret generation

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Longest lifetime a key may be issued with.
pub const MAX_EXPIRY_DAYS: i64 = 3650;

/// Generate a new opaque key secret (random UUID v4, hyphenated).
pub fn generate_api_key_secret() -> String {
    Uuid::new_v4().to_string()
}

/// Expiry timestamp `days` after `issued_at`.
pub fn expiry_after_days(issued_at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    issued_at + Duration::days(days)
}
