//! Custom error types and handling
//!
//! This module defines the grader's error type. Judge failures carry their own
//! taxonomy in [`crate::judge::JudgeError`] and are wrapped here.

use crate::judge::JudgeError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Rating engine errors
    #[error("Contest {0} ratings are already finalized")]
    AlreadyFinalized(uuid::Uuid),

    #[error("Contest {0} has not ended yet")]
    ContestNotEnded(uuid::Uuid),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // External service errors
    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::Conflict(_) => "CONFLICT",
            Self::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            Self::ContestNotEnded(_) => "CONTEST_NOT_ENDED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Judge(e) => e.error_code(),
            Self::Redis(_) => "REDIS_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the caller may retry the operation that produced this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Judge(e) => e.is_retryable(),
            Self::Database(_) | Self::Redis(_) => true,
            _ => false,
        }
    }
}

// Implement From for common error types
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violations
                if db_err.is_unique_violation() {
                    AppError::AlreadyExists("Resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(AppError::AlreadyFinalized(id).error_code(), "ALREADY_FINALIZED");
        assert_eq!(
            AppError::Judge(JudgeError::Timeout { polls: 3 }).error_code(),
            "JUDGE_TIMEOUT"
        );
        assert_eq!(
            AppError::Validation("bad".to_string()).to_string(),
            "Validation error: bad"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::Judge(JudgeError::Unavailable("down".to_string())).is_retryable());
        assert!(!AppError::Judge(JudgeError::Protocol("garbage".to_string())).is_retryable());
        assert!(!AppError::AlreadyFinalized(uuid::Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
