//! Database entities module

pub mod api_key;
pub mod api_key_usage;
pub mod user;

pub use api_key::Entity as ApiKey;
pub use api_key_usage::Entity as ApiKeyUsage;
pub use user::Entity as User;
