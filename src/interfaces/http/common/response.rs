//! Response envelope

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard API response wrapper.
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "description"}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Payload. `null` on error
    pub data: Option<T>,
    /// Error description. Omitted on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Payload for operations that return nothing but a confirmation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}
