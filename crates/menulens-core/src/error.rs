//! Error types for menulens.

use thiserror::Error;

/// Result type alias using menulens' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for menulens operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No preference profile stored for a device
    #[error("No preferences saved for device: {0}")]
    PreferencesNotFound(String),

    /// Menu extraction failed on both the primary and fallback paths
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Recommendation generation failed
    #[error("Recommendation error: {0}")]
    Recommendation(String),

    /// An external collaborator returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// A per-API quota denied the call
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Image bytes are not a supported encoding (user-actionable)
    #[error("Unsupported image format: {0}. Please upload PNG, JPEG, GIF, or WebP.")]
    UnsupportedImage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("dish cache entry".to_string());
        assert_eq!(err.to_string(), "Not found: dish cache entry");
    }

    #[test]
    fn test_error_display_preferences_not_found() {
        let err = Error::PreferencesNotFound("device-abc".to_string());
        assert_eq!(
            err.to_string(),
            "No preferences saved for device: device-abc"
        );
    }

    #[test]
    fn test_error_display_rate_limited() {
        let err = Error::RateLimited("image-search daily limit".to_string());
        assert_eq!(err.to_string(), "Rate limited: image-search daily limit");
    }

    #[test]
    fn test_error_display_unsupported_image() {
        let err = Error::UnsupportedImage("image/tiff".to_string());
        let msg = err.to_string();
        assert!(msg.contains("image/tiff"));
        assert!(msg.contains("PNG, JPEG, GIF, or WebP"));
    }

    #[test]
    fn test_error_display_provider() {
        let err = Error::Provider("vision backend returned 500".to_string());
        assert_eq!(err.to_string(), "Provider error: vision backend returned 500");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
