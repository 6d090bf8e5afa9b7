use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Query against the sections table failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store reported a failure that is not a driver error.
    #[error("backing store error: {0}")]
    Backend(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
