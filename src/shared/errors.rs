use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backing store failed (connection lost, constraint error, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// The store returned data that violates a uniqueness invariant.
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Errors that are the server's fault rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Inconsistent(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
