//! Liveness and readiness

pub mod handlers;

pub use handlers::*;
