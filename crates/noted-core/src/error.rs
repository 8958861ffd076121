//! Library-level error type.
//!
//! Store traits return raw [`sqlx::Error`]; everything above the store layer
//! (reconciler, services, completion providers) speaks [`NotedError`].  The
//! server crate maps each variant to an HTTP status.

use thiserror::Error;

/// All errors produced by `noted-core`.
#[derive(Debug, Error)]
pub enum NotedError {
    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migrations failed to apply on startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A required field was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced resource does not exist or is not visible to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// No current user could be resolved.
    #[error("user not authenticated")]
    Unauthenticated,

    /// The hosted completion endpoint failed.
    #[error("completion error: {0}")]
    Completion(String),
}

pub type Result<T, E = NotedError> = std::result::Result<T, E>;

impl From<genai::Error> for NotedError {
    fn from(e: genai::Error) -> Self {
        NotedError::Completion(e.to_string())
    }
}
