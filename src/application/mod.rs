//! Application layer: use cases on top of the domain traits.

pub mod gateway;
pub mod identity;
pub mod keys;

pub use gateway::{
    ApiKeyGateway, AuthDecision, Bookkeeping, Clock, DenialReason, GatewayError, SystemClock,
};
pub use identity::{AuthResult, UserService};
pub use keys::{ApiKeyService, KeyStatus, KeyStatusReport, KeyUsageReport};
