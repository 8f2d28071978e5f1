//! Common error types for ICC services

use thiserror::Error;

/// Common result type for ICC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ICC services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A write referenced a table or column the store does not have
    #[error("Schema gap: {0}")]
    SchemaGap(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Reclassify a store error raised by a write.
    ///
    /// Missing tables or columns become [`Error::SchemaGap`]; everything else
    /// stays a database error.
    pub fn from_write(err: sqlx::Error) -> Self {
        match crate::db::faults::schema_gap_detail(&err) {
            Some(detail) => Error::SchemaGap(detail),
            None => Error::Database(err),
        }
    }
}
