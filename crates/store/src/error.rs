use domain::RepositoryError;
use thiserror::Error;

/// Errors raised inside the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A condition the domain understands (conflict, duplicate, missing row).
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for RepositoryError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Repository(e) => e,
            StoreError::Serialization(e) => RepositoryError::Serialization(e),
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
