//! API key management endpoints (JWT protected)

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
