use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successful authorization. Written by the gateway, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: i32,
    pub api_key_id: i32,
    /// Request path, including the query string.
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointUsage {
    pub endpoint: String,
    pub count: i64,
}

/// A usage entry joined with the key that authorized it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerUsageEntry {
    pub id: i32,
    pub api_key_id: i32,
    pub key_name: String,
    pub key_secret: String,
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
}

/// Order per-endpoint counts: busiest first, then by endpoint.
pub fn sort_endpoint_usage(summary: &mut [EndpointUsage]) {
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.endpoint.cmp(&b.endpoint)));
}
