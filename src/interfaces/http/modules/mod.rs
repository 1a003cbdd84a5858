pub mod api_keys;
pub mod auth;
pub mod countries;
pub mod health;
pub mod metrics;
pub mod request_id;
