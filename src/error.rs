//! Domain error types for the job diary.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//!
//! Filesystem evidence problems (vanished directories, missing permissions) are
//! handled where they occur and never surface as `AppError`. Anything that does
//! reach a loop as an `AppError` terminates that loop.

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem operation failed in a way nobody handled
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}
