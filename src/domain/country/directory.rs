use async_trait::async_trait;
use thiserror::Error;

use super::Country;

#[derive(Debug, Error)]
pub enum CountryLookupError {
    #[error("No country matches '{0}'")]
    NotFound(String),

    #[error("Country data upstream failed: {0}")]
    Upstream(String),
}

/// Source of country data, looked up by (partial) name.
#[async_trait]
pub trait CountryDirectory: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Vec<Country>, CountryLookupError>;
}
