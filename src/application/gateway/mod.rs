//! API key gateway
//!
//! Decides whether a request carrying a candidate API key may proceed and,
//! when it may, records the use. See [`ApiKeyGateway::authorize`].

mod clock;
mod decision;
mod service;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use decision::{AuthDecision, DenialReason, GatewayError};
pub use service::{ApiKeyGateway, Bookkeeping};
