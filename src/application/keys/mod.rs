//! Owner-side management of API keys.

pub mod service;

pub use service::{ApiKeyService, KeyStatus, KeyStatusReport, KeyUsageReport};
