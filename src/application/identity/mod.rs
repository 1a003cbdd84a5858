//! Identity: registration, login and profile lookup.

pub mod service;

pub use service::{AuthResult, UserService};
