//! Error types for newswatch.

use thiserror::Error;

/// Result type alias using newswatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for newswatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Keyword not found
    #[error("Keyword not found: {0}")]
    KeywordNotFound(uuid::Uuid),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Search execution failed
    #[error("Search error: {0}")]
    Search(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_keyword_not_found() {
        let id = Uuid::nil();
        let err = Error::KeywordNotFound(id);
        assert_eq!(err.to_string(), format!("Keyword not found: {}", id));
    }

    #[test]
    fn test_error_display_job_not_found() {
        let id = Uuid::nil();
        let err = Error::JobNotFound(id);
        assert_eq!(err.to_string(), format!("Job not found: {}", id));
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing daily cap".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing daily cap");
    }

    #[test]
    fn test_error_display_job() {
        let err = Error::Job("claim failed".to_string());
        assert_eq!(err.to_string(), "Job error: claim failed");
    }
}
