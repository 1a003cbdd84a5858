//! Core entities and the storage / upstream traits they are accessed through.

pub mod api_key;
pub mod country;
pub mod repositories;
pub mod usage;
pub mod user;

pub use api_key::{mask_secret, ApiKeyRecord, ApiKeyRepository, KeyState, NewApiKey};
pub use country::{Country, CountryDirectory, CountryLookupError};
pub use repositories::RepositoryProvider;
pub use usage::{EndpointUsage, OwnerUsageEntry, UsageLogEntry, UsageLogRepository};
pub use user::{NewUser, User, UserRepository};

pub use crate::shared::errors::{DomainError, DomainResult};
