//! Country data endpoints (API key protected)

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
