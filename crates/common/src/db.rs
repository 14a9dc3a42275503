//! Shared store-level error type
//!
//! Entity store adapters report failures with `RepositoryError`; the engine
//! lifts them into [`Error`] with `?`.

use crate::error::Error;
use thiserror::Error;

/// Store-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already exists")]
    AlreadyExists,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// Classify a driver error, surfacing unique-constraint violations as `AlreadyExists`
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::AlreadyExists,
            _ => RepositoryError::Connection(err),
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Error::NotFound("Record not found".to_string()),
            RepositoryError::AlreadyExists => Error::Conflict("Record already exists".to_string()),
            RepositoryError::Connection(e) => {
                tracing::error!(error = %e, "Entity store unavailable");
                Error::StorageUnavailable(e.to_string())
            }
            RepositoryError::InvalidData(msg) => Error::Internal(msg),
        }
    }
}
