//! HTTP REST API
//!
//! - `middleware`: JWT and API key authentication
//! - `modules`: handlers and DTOs per resource
//! - `router`: route table, unified state and Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

#[cfg(test)]
mod tests;

pub use router::{create_api_router, ApiDoc, AppState};
