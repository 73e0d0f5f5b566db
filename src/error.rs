// Error handling module
// Structural failures only; per-request failures are folded into TimingRecords

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a performance run
#[derive(Error, Debug)]
pub enum PerfError {
    /// The configuration file does not exist
    #[error("Configuration file '{}' not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client (connection pool) could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Report output could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The admission semaphore was closed while requests were still queued
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, PerfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_message() {
        let err = PerfError::ConfigNotFound(PathBuf::from("config/missing.yml"));
        assert_eq!(
            err.to_string(),
            "Configuration file 'config/missing.yml' not found"
        );
    }

    #[test]
    fn test_invalid_config_message() {
        let err = PerfError::InvalidConfig("concurrent-requests must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: concurrent-requests must be at least 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: PerfError = io.into();
        assert!(matches!(err, PerfError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: read-only");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PerfError = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
