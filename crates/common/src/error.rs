//! Common error types and handling for Teamforge

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Teamforge engine
///
/// Every rule the engine enforces maps to one of the recoverable variants.
/// `StorageUnavailable` is the only fault that reflects the environment
/// rather than the caller's request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code for callers rendering messages
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can act on this error (as opposed to an infrastructure fault)
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::Unexpected(_) | Error::StorageUnavailable(_) | Error::Internal(_)
        )
    }
}
