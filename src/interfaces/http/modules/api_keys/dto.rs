//! API Key DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{KeyStatus, KeyStatusReport, KeyUsageReport};
use crate::domain::{mask_secret, ApiKeyRecord, EndpointUsage, OwnerUsageEntry, UsageLogEntry};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Travel blog",
    "expiryDays": 90
}))]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "API key name is required"))]
    pub name: String,
    /// Lifetime in days. Omit for a key that never expires.
    #[serde(default, alias = "expiryDays")]
    #[validate(range(min = 1, max = 3650, message = "expiryDays must be between 1 and 3650"))]
    pub expiry_days: Option<i64>,
}

/// A key as shown to its owner.
///
/// `key` holds the full secret in listings and on creation, and the masked
/// form everywhere else.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: i32,
    pub key: String,
    pub name: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub last_used_at: Option<String>,
    pub usage_count: i64,
}

impl ApiKeyResponse {
    pub fn full(record: ApiKeyRecord) -> Self {
        let key = record.secret.clone();
        Self::with_key(record, key)
    }

    pub fn masked(record: ApiKeyRecord) -> Self {
        let key = record.masked_secret();
        Self::with_key(record, key)
    }

    fn with_key(record: ApiKeyRecord, key: String) -> Self {
        Self {
            id: record.id,
            key,
            name: record.name,
            created_at: record.created_at.to_rfc3339(),
            expires_at: record.expires_at.map(|t| t.to_rfc3339()),
            is_active: record.is_active,
            last_used_at: record.last_used_at.map(|t| t.to_rfc3339()),
            usage_count: record.usage_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsageEntryDto {
    pub id: i32,
    pub api_key_id: i32,
    pub endpoint: String,
    pub request_timestamp: String,
}

impl From<UsageLogEntry> for UsageEntryDto {
    fn from(entry: UsageLogEntry) -> Self {
        Self {
            id: entry.id,
            api_key_id: entry.api_key_id,
            endpoint: entry.endpoint,
            request_timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EndpointUsageDto {
    pub endpoint: String,
    pub count: i64,
}

impl From<EndpointUsage> for EndpointUsageDto {
    fn from(usage: EndpointUsage) -> Self {
        Self {
            endpoint: usage.endpoint,
            count: usage.count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KeyUsageResponse {
    pub key: ApiKeyResponse,
    /// Newest first
    pub usage: Vec<UsageEntryDto>,
    pub summary: Vec<EndpointUsageDto>,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
}

impl From<KeyUsageReport> for KeyUsageResponse {
    fn from(report: KeyUsageReport) -> Self {
        let usage_count = report.key.usage_count;
        let last_used_at = report.key.last_used_at.map(|t| t.to_rfc3339());
        Self {
            key: ApiKeyResponse::masked(report.key),
            usage: report.entries.into_iter().map(UsageEntryDto::from).collect(),
            summary: report.summary.into_iter().map(EndpointUsageDto::from).collect(),
            usage_count,
            last_used_at,
        }
    }
}

/// One row of the owner's combined usage log.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsageLogDto {
    pub usage_id: i32,
    pub api_key_id: i32,
    pub endpoint: String,
    pub request_timestamp: String,
    pub key_name: String,
    /// Masked secret of the key that made the request
    pub key_value: String,
}

impl From<OwnerUsageEntry> for UsageLogDto {
    fn from(entry: OwnerUsageEntry) -> Self {
        Self {
            usage_id: entry.id,
            api_key_id: entry.api_key_id,
            endpoint: entry.endpoint,
            request_timestamp: entry.timestamp.to_rfc3339(),
            key_name: entry.key_name,
            key_value: mask_secret(&entry.key_secret),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusDto {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
    pub key_preview: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusResponse {
    pub keys_count: usize,
    pub active_keys_count: usize,
    pub keys: Vec<KeyStatusDto>,
}

impl From<KeyStatusReport> for KeyStatusResponse {
    fn from(report: KeyStatusReport) -> Self {
        Self {
            keys_count: report.total,
            active_keys_count: report.active,
            keys: report
                .keys
                .into_iter()
                .map(|KeyStatus { id, name, is_active, key_preview }| KeyStatusDto {
                    id,
                    name,
                    is_active,
                    key_preview,
                })
                .collect(),
        }
    }
}
